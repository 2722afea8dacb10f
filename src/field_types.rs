//! Per-field-type behavior: ordering, display, search, filter and export.
//!
//! Every column names a `FieldKind`; the registry maps kinds to a
//! `FieldType` implementation. Hosts may replace entries to customize a
//! kind; the built-in set is shared through a lazily built default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Kind of data held by a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Boolean,
    /// ISO-8601 strings or epoch milliseconds
    Date,
    /// Arrays of labels
    Tags,
}

/// A spreadsheet cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

/// Behavior contract for one field type.
pub trait FieldType: Send + Sync {
    /// Orders two values. Nulls sort before everything else.
    fn compare(&self, a: &Value, b: &Value) -> Ordering;

    /// Text shown in a cell.
    fn to_display_string(&self, value: &Value) -> String;

    /// Case-insensitive substring search; `needle` is already lowercase.
    fn matches_search(&self, value: &Value, needle: &str) -> bool {
        !value.is_null() && self.to_display_string(value).to_lowercase().contains(needle)
    }

    /// Whether `value` satisfies one selected filter value.
    fn matches_filter(&self, value: &Value, selected: &Value) -> bool {
        value == selected || self.to_display_string(value) == self.to_display_string(selected)
    }

    /// Spreadsheet representation of a value.
    fn to_sheet_cell(&self, value: &Value) -> SheetCell {
        if value.is_null() {
            SheetCell::Empty
        } else {
            SheetCell::Text(self.to_display_string(value))
        }
    }

    /// Column width when none is configured.
    fn default_width(&self) -> f32 {
        120.0
    }
}

/// Orders nulls first, then defers to `f`.
fn null_first(a: &Value, b: &Value, f: impl FnOnce() -> Ordering) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => f(),
    }
}

/// Plain JSON-to-text conversion without quotes around strings.
fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub struct TextField;

impl FieldType for TextField {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        null_first(a, b, || plain_text(a).cmp(&plain_text(b)))
    }

    fn to_display_string(&self, value: &Value) -> String {
        plain_text(value)
    }

    fn default_width(&self) -> f32 {
        160.0
    }
}

pub struct NumberField;

impl FieldType for NumberField {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        null_first(a, b, || match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => plain_text(a).cmp(&plain_text(b)),
        })
    }

    fn to_display_string(&self, value: &Value) -> String {
        plain_text(value)
    }

    fn matches_filter(&self, value: &Value, selected: &Value) -> bool {
        match (as_number(value), as_number(selected)) {
            (Some(x), Some(y)) => x == y,
            _ => value == selected,
        }
    }

    fn to_sheet_cell(&self, value: &Value) -> SheetCell {
        match as_number(value) {
            Some(n) => SheetCell::Number(n),
            None if value.is_null() => SheetCell::Empty,
            None => SheetCell::Text(plain_text(value)),
        }
    }

    fn default_width(&self) -> f32 {
        100.0
    }
}

pub struct BooleanField;

impl BooleanField {
    fn truthy(value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "1"),
            _ => false,
        }
    }
}

impl FieldType for BooleanField {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        null_first(a, b, || Self::truthy(a).cmp(&Self::truthy(b)))
    }

    fn to_display_string(&self, value: &Value) -> String {
        if value.is_null() {
            String::new()
        } else if Self::truthy(value) {
            "Yes".to_string()
        } else {
            "No".to_string()
        }
    }

    fn matches_filter(&self, value: &Value, selected: &Value) -> bool {
        !value.is_null() && Self::truthy(value) == Self::truthy(selected)
    }

    fn to_sheet_cell(&self, value: &Value) -> SheetCell {
        if value.is_null() {
            SheetCell::Empty
        } else {
            SheetCell::Bool(Self::truthy(value))
        }
    }

    fn default_width(&self) -> f32 {
        80.0
    }
}

pub struct DateField;

impl FieldType for DateField {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        // Epoch numbers compare numerically, ISO strings lexicographically
        null_first(a, b, || match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            _ => plain_text(a).cmp(&plain_text(b)),
        })
    }

    fn to_display_string(&self, value: &Value) -> String {
        plain_text(value)
    }

    fn default_width(&self) -> f32 {
        140.0
    }
}

pub struct TagsField;

impl TagsField {
    fn labels(value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.iter().map(plain_text).collect(),
            Value::Null => Vec::new(),
            other => vec![plain_text(other)],
        }
    }
}

impl FieldType for TagsField {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        null_first(a, b, || Self::labels(a).cmp(&Self::labels(b)))
    }

    fn to_display_string(&self, value: &Value) -> String {
        Self::labels(value).join(", ")
    }

    fn matches_search(&self, value: &Value, needle: &str) -> bool {
        Self::labels(value).iter().any(|label| label.to_lowercase().contains(needle))
    }

    fn matches_filter(&self, value: &Value, selected: &Value) -> bool {
        let wanted = plain_text(selected);
        Self::labels(value).iter().any(|label| *label == wanted)
    }

    fn default_width(&self) -> f32 {
        180.0
    }
}

/// Maps field kinds to their behavior.
#[derive(Clone)]
pub struct FieldTypeRegistry {
    types: HashMap<FieldKind, Arc<dyn FieldType>>,
}

static DEFAULT_REGISTRY: once_cell::sync::Lazy<FieldTypeRegistry> =
    once_cell::sync::Lazy::new(FieldTypeRegistry::builtin);

impl FieldTypeRegistry {
    /// Registry with the built-in implementation for every kind.
    pub fn builtin() -> Self {
        let mut types: HashMap<FieldKind, Arc<dyn FieldType>> = HashMap::new();
        types.insert(FieldKind::Text, Arc::new(TextField));
        types.insert(FieldKind::Number, Arc::new(NumberField));
        types.insert(FieldKind::Boolean, Arc::new(BooleanField));
        types.insert(FieldKind::Date, Arc::new(DateField));
        types.insert(FieldKind::Tags, Arc::new(TagsField));
        Self { types }
    }

    /// Shared built-in registry.
    pub fn shared() -> &'static FieldTypeRegistry {
        &DEFAULT_REGISTRY
    }

    /// Replaces the implementation of one kind.
    pub fn register(&mut self, kind: FieldKind, field_type: Arc<dyn FieldType>) {
        self.types.insert(kind, field_type);
    }

    /// Implementation for `kind`, falling back to text.
    pub fn get(&self, kind: FieldKind) -> &dyn FieldType {
        match self.types.get(&kind) {
            Some(field_type) => field_type.as_ref(),
            None => &TextField,
        }
    }

    /// Owned handle to the implementation for `kind`, for renderers that
    /// outlive the registry borrow.
    pub fn get_shared(&self, kind: FieldKind) -> Arc<dyn FieldType> {
        match self.types.get(&kind) {
            Some(field_type) => Arc::clone(field_type),
            None => Arc::new(TextField),
        }
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::shared().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_compare_handles_strings_and_nulls() {
        let registry = FieldTypeRegistry::shared();
        let number = registry.get(FieldKind::Number);
        assert_eq!(number.compare(&json!(2), &json!("10")), Ordering::Less);
        assert_eq!(number.compare(&Value::Null, &json!(-5)), Ordering::Less);
        assert_eq!(number.compare(&json!(1.5), &json!(1.5)), Ordering::Equal);
    }

    #[test]
    fn test_text_search_is_case_insensitive() {
        let text = FieldTypeRegistry::shared().get(FieldKind::Text);
        assert!(text.matches_search(&json!("Hello World"), "world"));
        assert!(!text.matches_search(&Value::Null, ""));
    }

    #[test]
    fn test_tags_filter_matches_any_label() {
        let tags = FieldTypeRegistry::shared().get(FieldKind::Tags);
        assert!(tags.matches_filter(&json!(["red", "blue"]), &json!("blue")));
        assert!(!tags.matches_filter(&json!(["red"]), &json!("green")));
        assert_eq!(tags.to_display_string(&json!(["a", "b"])), "a, b");
    }

    #[test]
    fn test_boolean_sheet_cell() {
        let boolean = FieldTypeRegistry::shared().get(FieldKind::Boolean);
        assert_eq!(boolean.to_sheet_cell(&json!("yes")), SheetCell::Bool(true));
        assert_eq!(boolean.to_sheet_cell(&Value::Null), SheetCell::Empty);
        assert_eq!(boolean.to_display_string(&json!(false)), "No");
    }

    #[test]
    fn test_date_compares_epoch_numbers() {
        let date = FieldTypeRegistry::shared().get(FieldKind::Date);
        assert_eq!(date.compare(&json!(1000), &json!(999)), Ordering::Greater);
        assert_eq!(date.compare(&json!("2024-01-02"), &json!("2024-01-10")), Ordering::Less);
    }

    #[test]
    fn test_register_overrides_kind() {
        struct Upper;
        impl FieldType for Upper {
            fn compare(&self, a: &Value, b: &Value) -> Ordering {
                plain_text(a).cmp(&plain_text(b))
            }
            fn to_display_string(&self, value: &Value) -> String {
                plain_text(value).to_uppercase()
            }
        }
        let mut registry = FieldTypeRegistry::builtin();
        registry.register(FieldKind::Text, Arc::new(Upper));
        assert_eq!(registry.get(FieldKind::Text).to_display_string(&json!("ab")), "AB");
    }
}

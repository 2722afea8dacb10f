//! Immutable table state.
//!
//! Every heavy field sits behind an `Arc`, so cloning a state is cheap and
//! a transition only reallocates the fields it actually changes.

use crate::config::TableConfig;
use crate::model::{
    collect_leaves, ColumnDef, ColumnKey, FilterSpec, Pagination, RowKey, RowStore, SortDirection,
    SortSpec, SorterInput, Template, TemplateColumn,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Snapshot of one table instance.
#[derive(Debug, Clone)]
pub struct TableState {
    pub(crate) config: Arc<TableConfig>,
    pub(crate) columns: Arc<Vec<ColumnDef>>,
    /// UI column key → field path, leaves only
    pub(crate) field_index: Arc<HashMap<ColumnKey, String>>,
    pub(crate) hidden: Arc<HashSet<ColumnKey>>,
    pub(crate) widths: Arc<HashMap<ColumnKey, f32>>,
    pub(crate) rows: Arc<RowStore>,
    pub(crate) sorters: Arc<SortSpec>,
    pub(crate) filters: Arc<FilterSpec>,
    /// Search term of this table instance
    pub(crate) search: Arc<str>,
    pub(crate) pagination: Pagination,
    pub(crate) expanded: Arc<ExpandedKeys>,
    pub(crate) loading: bool,
    pub(crate) templates: Arc<Vec<Template>>,
    pub(crate) active_template: Option<String>,
    /// Bumped by every transition that changes something
    pub(crate) revision: u64,
}

/// Expanded row keys in expansion order, with a hash index for lookups.
#[derive(Debug, Clone, Default)]
pub struct ExpandedKeys {
    order: Vec<RowKey>,
    index: HashSet<RowKey>,
}

impl ExpandedKeys {
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    pub fn as_slice(&self) -> &[RowKey] {
        &self.order
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowKey> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Appends a key unless it is already present.
    ///
    /// # Returns
    /// `true` if the key was added.
    pub fn insert(&mut self, key: RowKey) -> bool {
        if !self.index.insert(key.clone()) {
            return false;
        }
        self.order.push(key);
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if !self.index.remove(key) {
            return false;
        }
        self.order.retain(|k| k != key);
        true
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let index = &mut self.index;
        self.order.retain(|k| {
            let kept = keep(k);
            if !kept {
                index.remove(k);
            }
            kept
        });
    }
}

impl FromIterator<RowKey> for ExpandedKeys {
    fn from_iter<I: IntoIterator<Item = RowKey>>(iter: I) -> Self {
        let mut keys = Self::default();
        for key in iter {
            keys.insert(key);
        }
        keys
    }
}

impl TableState {
    /// Creates the initial state for a column set.
    ///
    /// Columns flagged `hidden_by_default` start hidden.
    pub fn new(config: &TableConfig, columns: Vec<ColumnDef>) -> Self {
        let mut columns = columns;
        super::columns::reindex_tree(&mut columns);
        let mut hidden = HashSet::new();
        collect_default_hidden(&columns, &mut hidden);
        Self {
            config: Arc::new(config.clone()),
            field_index: Arc::new(build_field_index(&columns)),
            columns: Arc::new(columns),
            hidden: Arc::new(hidden),
            widths: Arc::new(HashMap::new()),
            rows: Arc::new(RowStore::new()),
            sorters: Arc::new(SortSpec::default()),
            filters: Arc::new(FilterSpec::new()),
            search: Arc::from(""),
            pagination: Pagination::new(config.default_page_size),
            expanded: Arc::new(ExpandedKeys::default()),
            loading: false,
            templates: Arc::new(Vec::new()),
            active_template: None,
            revision: 0,
        }
    }

    // ===== Accessors =====

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Field path of a leaf column.
    pub fn field_of(&self, key: &str) -> Option<&str> {
        self.field_index.get(key).map(String::as_str)
    }

    /// Leaf column with the given field path.
    pub fn column_for_field(&self, field: &str) -> Option<&ColumnDef> {
        collect_leaves(&self.columns).into_iter().find(|c| c.field == field)
    }

    /// UI key of the leaf column bound to a field path.
    pub fn key_of_field(&self, field: &str) -> Option<&str> {
        self.field_index
            .iter()
            .find(|(_, f)| f.as_str() == field)
            .map(|(key, _)| key.as_str())
    }

    /// Leaf field paths currently defined.
    pub fn leaf_fields(&self) -> HashSet<String> {
        self.field_index.values().cloned().collect()
    }

    pub fn hidden(&self) -> &HashSet<ColumnKey> {
        &self.hidden
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden.contains(key)
    }

    pub fn widths(&self) -> &HashMap<ColumnKey, f32> {
        &self.widths
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    /// Shared handle to the row arena, for identity checks across snapshots.
    pub fn rows_arc(&self) -> &Arc<RowStore> {
        &self.rows
    }

    pub fn sorters(&self) -> &SortSpec {
        &self.sorters
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Expanded row keys in expansion order.
    pub fn expanded(&self) -> &[RowKey] {
        self.expanded.as_slice()
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn favorite_template(&self) -> Option<&Template> {
        self.templates.iter().find(|t| t.favorite)
    }

    pub fn active_template(&self) -> Option<&str> {
        self.active_template.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sorter list produced by clicking a column header.
    ///
    /// The clicked column cycles ascend → descend → unsorted and is listed
    /// last, so sort normalization treats it as the latest.
    pub fn sorters_after_click(&self, column_key: &str) -> Vec<SorterInput> {
        let Some(field) = self.field_of(column_key) else {
            return Vec::new();
        };
        let next = SortDirection::next(self.sorters.direction_of(field));
        let mut inputs: Vec<SorterInput> = self
            .sorters
            .entries()
            .iter()
            .filter(|entry| entry.field != field)
            .filter_map(|entry| {
                self.key_of_field(&entry.field)
                    .map(|key| SorterInput::new(key, Some(entry.direction)))
            })
            .collect();
        inputs.push(SorterInput::new(column_key, next));
        inputs
    }

    // ===== Template Snapshot =====

    /// Captures the current view configuration as a template.
    pub fn snapshot_template(&self, id: &str, name: &str, favorite: bool) -> Template {
        let mut columns = Vec::new();
        snapshot_columns(&self.columns, &self.widths, &self.hidden, &mut columns);

        let mut sort_priority = BTreeMap::new();
        for leaf in collect_leaves(&self.columns) {
            if let Some(priority) = leaf.sort.priority() {
                sort_priority.insert(leaf.field.clone(), priority);
            }
        }

        Template {
            id: id.to_string(),
            name: name.to_string(),
            favorite,
            columns,
            sorters: (*self.sorters).clone(),
            filters: (*self.filters).clone(),
            pagination: Pagination { total: 0, ..self.pagination },
            sort_priority,
        }
    }
}

/// UI key → field path for every leaf.
pub(crate) fn build_field_index(columns: &[ColumnDef]) -> HashMap<ColumnKey, String> {
    collect_leaves(columns)
        .into_iter()
        .map(|leaf| (leaf.key.clone(), leaf.field.clone()))
        .collect()
}

fn collect_default_hidden(columns: &[ColumnDef], hidden: &mut HashSet<ColumnKey>) {
    for column in columns {
        if column.hidden_by_default {
            hidden.insert(column.key.clone());
        }
        collect_default_hidden(&column.children, hidden);
    }
}

fn snapshot_columns(
    columns: &[ColumnDef],
    widths: &HashMap<ColumnKey, f32>,
    hidden: &HashSet<ColumnKey>,
    out: &mut Vec<TemplateColumn>,
) {
    for (order, column) in columns.iter().enumerate() {
        out.push(TemplateColumn {
            field: column.identity().to_string(),
            order,
            width: widths.get(&column.key).copied().or(column.width),
            hidden: hidden.contains(&column.key),
        });
        snapshot_columns(&column.children, widths, hidden, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_indexes_fields_and_hidden() {
        let columns = vec![
            ColumnDef::new("user.name", "Name").with_key("name"),
            ColumnDef::new("secret", "Secret").hidden(),
        ];
        let state = TableState::new(&TableConfig::default(), columns);
        assert_eq!(state.field_of("name"), Some("user.name"));
        assert!(state.is_hidden("secret"));
        assert_eq!(state.pagination().current, 1);
        assert_eq!(state.pagination().page_size, 20);
        assert_eq!(state.columns()[1].order, 1);
    }

    #[test]
    fn test_expanded_keys_keep_order_and_index_in_step() {
        let mut keys: ExpandedKeys = ["b", "a", "c"].iter().map(|k| k.to_string()).collect();
        assert!(!keys.insert("a".into()));
        assert!(keys.insert("d".into()));
        assert!(keys.remove("b"));
        assert!(!keys.remove("b"));
        keys.retain(|k| k != "c");
        assert_eq!(keys.as_slice(), ["a", "d"]);
        assert!(keys.contains("a") && keys.contains("d"));
        assert!(!keys.contains("b") && !keys.contains("c"));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_snapshot_captures_layout() {
        let columns = vec![
            ColumnDef::new("a", "A").with_width(50.0),
            ColumnDef::group("g", "G", vec![ColumnDef::new("b", "B").multi_sort(3)]),
        ];
        let state = TableState::new(&TableConfig::default(), columns);
        let template = state.snapshot_template("t1", "Mine", true);
        let fields: Vec<_> = template.columns.iter().map(|c| (c.field.as_str(), c.order)).collect();
        assert_eq!(fields, vec![("a", 0), ("g", 1), ("b", 0)]);
        assert_eq!(template.columns[0].width, Some(50.0));
        assert_eq!(template.sort_priority.get("b"), Some(&3));
        assert!(template.favorite);
    }
}

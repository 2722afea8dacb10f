//! Column definitions.

use crate::field_types::FieldKind;
use crate::table::CellRenderer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type alias for column keys (UI identifiers, unique among siblings)
pub type ColumnKey = String;

/// Where a top-level column is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FixedPosition {
    Left,
    #[default]
    None,
    Right,
}

impl FixedPosition {
    /// Rank used for the stable left / floating / right grouping.
    pub fn rank(self) -> u8 {
        match self {
            FixedPosition::Left => 0,
            FixedPosition::None => 1,
            FixedPosition::Right => 2,
        }
    }
}

/// Sort capability of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortConfig {
    /// Column cannot be sorted
    #[default]
    Disabled,
    /// Sorting this column replaces any other sorter
    Single,
    /// Participates in multi-column sort; higher priority is applied first
    Multiple { priority: u32 },
}

impl SortConfig {
    pub fn is_sortable(self) -> bool {
        !matches!(self, SortConfig::Disabled)
    }

    pub fn priority(self) -> Option<u32> {
        match self {
            SortConfig::Multiple { priority } => Some(priority),
            _ => None,
        }
    }
}

/// A raw column definition as supplied by the host.
///
/// Group columns carry `children` and no meaningful `field`; leaves carry a
/// `field` path that is unique among all leaves.
#[derive(Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub key: ColumnKey,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default = "default_min_width")]
    pub min_width: f32,
    #[serde(default)]
    pub fixed: FixedPosition,
    #[serde(default)]
    pub sort: SortConfig,
    /// Values offered by the column's filter dropdown
    #[serde(default)]
    pub filter_values: Vec<serde_json::Value>,
    #[serde(default)]
    pub children: Vec<ColumnDef>,
    #[serde(default)]
    pub order: usize,
    #[serde(default = "default_true")]
    pub resizable: bool,
    #[serde(default = "default_true")]
    pub draggable: bool,
    #[serde(default)]
    pub field_type: FieldKind,
    #[serde(default)]
    pub hidden_by_default: bool,
    /// Searched even while hidden
    #[serde(default)]
    pub always_searchable: bool,
    #[serde(skip)]
    pub renderer: Option<CellRenderer>,
}

fn default_min_width() -> f32 {
    40.0
}

fn default_true() -> bool {
    true
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("key", &self.key)
            .field("field", &self.field)
            .field("width", &self.width)
            .field("fixed", &self.fixed)
            .field("sort", &self.sort)
            .field("order", &self.order)
            .field("children", &self.children)
            .field("custom_renderer", &self.renderer.is_some())
            .finish()
    }
}

impl ColumnDef {
    /// Creates a leaf column whose key and field path are the same.
    pub fn new(field: &str, title: &str) -> Self {
        Self {
            key: field.to_string(),
            field: field.to_string(),
            title: title.to_string(),
            width: None,
            min_width: default_min_width(),
            fixed: FixedPosition::None,
            sort: SortConfig::Disabled,
            filter_values: Vec::new(),
            children: Vec::new(),
            order: 0,
            resizable: true,
            draggable: true,
            field_type: FieldKind::Text,
            hidden_by_default: false,
            always_searchable: false,
            renderer: None,
        }
    }

    /// Creates a header group over the given children.
    pub fn group(key: &str, title: &str, children: Vec<ColumnDef>) -> Self {
        let mut column = Self::new("", title);
        column.key = key.to_string();
        column.children = children;
        column
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_type(mut self, kind: FieldKind) -> Self {
        self.field_type = kind;
        self
    }

    pub fn fixed(mut self, position: FixedPosition) -> Self {
        self.fixed = position;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sort = SortConfig::Single;
        self
    }

    pub fn multi_sort(mut self, priority: u32) -> Self {
        self.sort = SortConfig::Multiple { priority };
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden_by_default = true;
        self
    }

    pub fn with_renderer(mut self, renderer: CellRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Identity used to match a column across schema changes: the field
    /// path for leaves, the key for groups.
    pub fn identity(&self) -> &str {
        if self.is_leaf() && !self.field.is_empty() {
            &self.field
        } else {
            &self.key
        }
    }

    /// Visits every leaf below (and including) this column in order.
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a ColumnDef)) {
        if self.is_leaf() {
            f(self);
        } else {
            for child in &self.children {
                child.for_each_leaf(f);
            }
        }
    }

    /// Number of leaves below (and including) this column.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.for_each_leaf(&mut |_| count += 1);
        count
    }
}

/// Collects every leaf of a column list in display order.
pub(crate) fn collect_leaves(columns: &[ColumnDef]) -> Vec<&ColumnDef> {
    let mut leaves = Vec::new();
    for column in columns {
        column.for_each_leaf(&mut |leaf| leaves.push(leaf));
    }
    leaves
}

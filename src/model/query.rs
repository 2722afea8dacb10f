//! Sort, filter and pagination parameters.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascend,
    Descend,
}

impl SortDirection {
    /// Cycles ascend → descend → unsorted, as header clicks do.
    pub fn next(current: Option<SortDirection>) -> Option<SortDirection> {
        match current {
            None => Some(SortDirection::Ascend),
            Some(SortDirection::Ascend) => Some(SortDirection::Descend),
            Some(SortDirection::Descend) => None,
        }
    }
}

/// One active sorter, keyed by field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub field: String,
    pub direction: SortDirection,
    #[serde(default)]
    pub priority: Option<u32>,
}

/// Normalized sort state: entries in application order (first = primary key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SortSpec {
    entries: Vec<SortEntry>,
}

impl SortSpec {
    pub fn new(entries: Vec<SortEntry>) -> Self {
        Self { entries }
    }

    /// Single-field ascending or descending sort.
    pub fn single(field: &str, direction: SortDirection) -> Self {
        Self::new(vec![SortEntry {
            field: field.to_string(),
            direction,
            priority: None,
        }])
    }

    pub fn entries(&self) -> &[SortEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn direction_of(&self, field: &str) -> Option<SortDirection> {
        self.entries.iter().find(|e| e.field == field).map(|e| e.direction)
    }

    /// Field path → direction view of the spec.
    pub fn as_map(&self) -> BTreeMap<String, SortDirection> {
        self.entries.iter().map(|e| (e.field.clone(), e.direction)).collect()
    }

    /// Keeps only sorters on fields that still exist.
    pub fn retain_fields(&mut self, fields: &HashSet<String>) {
        self.entries.retain(|e| fields.contains(&e.field));
    }
}

/// A sorter change as reported by a header interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorterInput {
    /// UI column key
    pub column_key: String,
    /// None clears the sorter
    pub direction: Option<SortDirection>,
}

impl SorterInput {
    pub fn new(column_key: &str, direction: Option<SortDirection>) -> Self {
        Self {
            column_key: column_key.to_string(),
            direction,
        }
    }
}

/// Field path → selected filter values.
pub type FilterSpec = BTreeMap<String, Vec<serde_json::Value>>;

/// Pagination state. `current` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: usize,
    pub page_size: usize,
    #[serde(default)]
    pub total: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            current: 1,
            page_size: page_size.max(1),
            total: 0,
        }
    }

    /// Returns a copy with `current ≥ 1` and `page_size ≥ 1`.
    pub fn normalized(self) -> Self {
        Self {
            current: self.current.max(1),
            page_size: self.page_size.max(1),
            total: self.total,
        }
    }

    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size.max(1))
    }

    /// Index range of the current page within `len` items.
    ///
    /// A page beyond the end falls back to the last page.
    pub fn page_range(&self, len: usize) -> std::ops::Range<usize> {
        let size = self.page_size.max(1);
        let last_page = len.div_ceil(size).max(1);
        let page = self.current.clamp(1, last_page);
        let start = (page - 1) * size;
        start.min(len)..(start + size).min(len)
    }
}

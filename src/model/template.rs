//! Saved view templates.

use crate::model::{FilterSpec, Pagination, SortSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Saved layout of one column, matched back by identity (field path for
/// leaves, key for groups).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateColumn {
    pub field: String,
    /// Position among siblings at save time
    pub order: usize,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub hidden: bool,
}

/// A named snapshot of the table view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    /// Auto-applied before the first fetch; at most one per table
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub columns: Vec<TemplateColumn>,
    #[serde(default)]
    pub sorters: SortSpec,
    #[serde(default)]
    pub filters: FilterSpec,
    pub pagination: Pagination,
    /// Multi-sort priority per field path
    #[serde(default)]
    pub sort_priority: BTreeMap<String, u32>,
}

impl Template {
    /// Generates a fresh template id.
    pub fn generate_id() -> String {
        format!("tpl-{:016x}", rand::random::<u64>())
    }
}

/// Clears every favorite flag except the first one found.
pub(crate) fn enforce_single_favorite(templates: &mut [Template]) {
    let mut seen = false;
    for template in templates.iter_mut() {
        if template.favorite {
            if seen {
                template.favorite = false;
            }
            seen = true;
        }
    }
}

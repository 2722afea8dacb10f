//! Engine configuration.
//!
//! Every field has a default so partial JSON files are accepted.

use crate::error::{Result, TableError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where row data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    /// Rows are held in memory and projected locally (search, filter, sort, page).
    #[default]
    Sync,
    /// An external provider owns the data; parameters are forwarded to it.
    Async,
}

/// Tunables for windowing, expansion and pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Extra rows materialized above and below the viewport
    pub overscan: usize,
    /// Shadow height used before the first real measurement
    pub estimated_row_height: f32,
    /// Collapsing a row with more children than this evicts them
    pub eviction_threshold: usize,
    /// Page size used when nothing else is known
    pub default_page_size: usize,
    /// Take incoming column order verbatim on column updates
    pub force_columns: bool,
    /// Data ownership mode
    pub mode: DataMode,
    /// Include hidden columns in search matching
    pub search_hidden_fields: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            overscan: 5,
            estimated_row_height: 40.0,
            eviction_threshold: 300,
            default_page_size: 20,
            force_columns: false,
            mode: DataMode::Sync,
            search_hidden_fields: false,
        }
    }
}

impl TableConfig {
    /// Parses a config from a JSON string and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TableConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file. Missing fields fall back to defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.estimated_row_height > 0.0) {
            return Err(TableError::Config(format!(
                "estimated_row_height must be positive, got {}",
                self.estimated_row_height
            )));
        }
        if self.default_page_size == 0 {
            return Err(TableError::Config("default_page_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

//! JSON dataset files: column definitions plus a row tree.
//!
//! This is the on-disk format the viewer opens and the data generator
//! writes.

use crate::config::TableConfig;
use crate::error::Result;
use crate::model::{ColumnDef, Row};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A table's columns and rows, optionally with its engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<TableConfig>,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>) -> Self {
        Self { config: None, columns, rows }
    }

    /// Parses a dataset from JSON text. An embedded config is validated.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Reads a dataset file.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(fs::File::open(path)?);
        let dataset: Dataset = serde_json::from_reader(reader)?;
        dataset.validate()?;
        log::info!(
            "loaded dataset {} ({} columns, {} root rows)",
            path.display(),
            dataset.columns.len(),
            dataset.rows.len()
        );
        Ok(dataset)
    }

    /// Writes the dataset as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Number of rows including inline descendants.
    pub fn total_rows(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&Row> = self.rows.iter().collect();
        while let Some(row) = stack.pop() {
            count += 1;
            if let Some(children) = &row.children {
                stack.extend(children.iter());
            }
        }
        count
    }

    /// Embedded config, or the default one.
    pub fn config_or_default(&self) -> TableConfig {
        self.config.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        match &self.config {
            Some(config) => config.validate(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataMode;

    #[test]
    fn test_parse_with_nested_rows() {
        let json = r#"{
            "columns": [{"key": "name", "field": "name", "title": "Name"}],
            "rows": [
                {"key": "a", "values": {"name": "A"}, "children": [{"key": "a1"}]},
                {"key": "b", "lazy": true}
            ]
        }"#;
        let dataset = Dataset::from_json_str(json).unwrap();
        assert_eq!(dataset.columns.len(), 1);
        assert_eq!(dataset.total_rows(), 3);
        assert!(dataset.rows[1].lazy);
        assert_eq!(dataset.config_or_default(), TableConfig::default());
    }

    #[test]
    fn test_embedded_config_is_validated() {
        let json = r#"{"config": {"default_page_size": 0}, "columns": []}"#;
        assert!(Dataset::from_json_str(json).is_err());

        let json = r#"{"config": {"mode": "async"}, "columns": []}"#;
        let dataset = Dataset::from_json_str(json).unwrap();
        assert_eq!(dataset.config_or_default().mode, DataMode::Async);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let dataset = Dataset::new(
            vec![ColumnDef::new("n", "N")],
            vec![Row::new("r0").with("n", 1).with_children(vec![Row::new("r0/0")])],
        );
        dataset.save(&path).unwrap();
        let loaded = Dataset::load(&path).unwrap();
        assert_eq!(loaded.rows, dataset.rows);
        assert_eq!(loaded.columns[0].field, "n");
    }
}

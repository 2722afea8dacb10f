//! File-backed template persistence.

use crate::error::Result;
use crate::model::Template;
use crate::providers::TemplateProvider;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "rvtable";
const TEMPLATES_FILE: &str = "templates.json";

/// Stores templates as a JSON array in a single file.
///
/// A missing file reads as an empty list. Saves go through a temporary
/// file and a rename so a crash never leaves a truncated list behind.
#[derive(Debug, Clone)]
pub struct JsonTemplateStore {
    path: PathBuf,
}

impl JsonTemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the per-user config directory, if the platform has one.
    pub fn user_default() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join(APP_DIR).join(TEMPLATES_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemplateProvider for JsonTemplateStore {
    fn load(&self) -> Result<Vec<Template>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, templates: &[Template]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(templates)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json)?;
        fs::rename(&staging, &self.path)?;
        log::debug!("saved {} template(s) to {}", templates.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTemplateStore::new(dir.path().join("none.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        fs::write(&path, "{not json").unwrap();
        let err = JsonTemplateStore::new(&path).load().unwrap_err();
        assert!(matches!(err, TableError::Json(_)));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTemplateStore::new(dir.path().join("a/b/templates.json"));
        store.save(&[]).unwrap();
        assert!(store.path().exists());
        assert!(store.load().unwrap().is_empty());
    }
}

//! Viewer preferences persisted through eframe storage.

use rvtable::DataMode;
use serde::{Deserialize, Serialize};

const SETTINGS_KEY: &str = "vtable_settings";

/// Preferences restored on the next start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiSettings {
    pub dark_mode: bool,
    /// Mode used for the next dataset load
    pub mode: DataMode,
    /// Simulated provider latency in asynchronous mode
    pub latency_ms: u64,
    pub page_size: usize,
}

impl Default for GuiSettings {
    fn default() -> Self {
        Self {
            dark_mode: true,
            mode: DataMode::Sync,
            latency_ms: 250,
            page_size: 1_000,
        }
    }
}

/// Loads and saves `GuiSettings` as one JSON string.
pub struct SettingsCoordinator;

impl SettingsCoordinator {
    /// Reads the stored settings, falling back to defaults when missing or
    /// unreadable.
    pub fn load(storage: Option<&dyn eframe::Storage>) -> GuiSettings {
        storage
            .and_then(|s| s.get_string(SETTINGS_KEY))
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("ignoring stored settings: {e}");
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn save(storage: &mut dyn eframe::Storage, settings: &GuiSettings) {
        match serde_json::to_string(settings) {
            Ok(json) => {
                storage.set_string(SETTINGS_KEY, json);
                storage.flush();
            }
            Err(e) => log::warn!("failed to serialize settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_storage_gives_defaults() {
        assert_eq!(SettingsCoordinator::load(None), GuiSettings::default());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: GuiSettings = serde_json::from_str(r#"{"dark_mode": false}"#).unwrap();
        assert!(!settings.dark_mode);
        assert_eq!(settings.latency_ms, 250);
    }
}

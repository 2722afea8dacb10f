//! Viewer state.
//!
//! The table itself lives in a `TableController`; everything here is
//! viewer chrome around it: text inputs, preferences and messages.

use crate::app::GuiSettings;
use rvtable::TableController;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Change events shown in the status bar, newest last.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Number of change events kept for display.
pub const EVENT_LOG_LEN: usize = 5;

pub struct AppState {
    // ===== Table =====
    /// Controller for the loaded dataset
    pub table: Option<TableController>,
    /// File the dataset came from; `None` for generated data
    pub dataset_path: Option<PathBuf>,

    // ===== Inputs =====
    pub search_text: String,
    pub template_name: String,
    pub template_favorite: bool,

    // ===== Preferences =====
    pub settings: GuiSettings,

    // ===== Messages =====
    /// Error from loading, exporting or a provider
    pub error_message: Option<String>,
    /// One-line feedback such as "exported to ..."
    pub status_message: Option<String>,
    pub events: EventLog,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GuiSettings::default())
    }
}

impl AppState {
    pub fn new(settings: GuiSettings) -> Self {
        Self {
            table: None,
            dataset_path: None,
            search_text: String::new(),
            template_name: String::new(),
            template_favorite: false,
            settings,
            error_message: None,
            status_message: None,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Drops the current table before a new dataset loads.
    pub fn reset_table_state(&mut self) {
        self.table = None;
        self.dataset_path = None;
        self.search_text.clear();
        self.error_message = None;
        self.status_message = None;
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    /// Most recent change events.
    pub fn recent_events(&self) -> Vec<String> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

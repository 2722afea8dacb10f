//! Application-level modules for the table viewer.
//!
//! This module contains the application coordinator and the viewer state.

mod app_state;
mod application_coordinator;
mod theme_coordinator;
mod settings_coordinator;

pub use app_state::AppState;
pub use application_coordinator::ApplicationCoordinator;
pub use theme_coordinator::ThemeCoordinator;
pub use settings_coordinator::{GuiSettings, SettingsCoordinator};

//! UI panels.
//!
//! Each panel renders itself and reports user interactions as values; the
//! application coordinator applies them.

pub mod header;
pub mod panel_manager;
pub mod status_bar;
pub mod table_header;
pub mod table_panel;

pub use panel_manager::{PanelInteraction, PanelManager};

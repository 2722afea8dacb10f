//! Panel orchestration and layout management.
//!
//! Header on top, status bar at the bottom, table in the center.

use crate::app::AppState;
use crate::io::AsyncLoader;
use crate::ui::header::{self, HeaderInteraction};
use crate::ui::status_bar::{self, PagerInteraction};
use crate::ui::table_panel::{self, TablePanelInteraction};

/// Result of panel interactions that need to be handled by the application coordinator.
pub enum PanelInteraction {
    Header(HeaderInteraction),
    Table(TablePanelInteraction),
    Pager(PagerInteraction),
}

/// Manages the layout and rendering of all UI panels.
pub struct PanelManager;

impl PanelManager {
    /// Renders all panels in the application window.
    ///
    /// Called from the eframe::App::update() implementation. At most one
    /// interaction is reported per frame.
    pub fn render_all_panels(
        ctx: &egui::Context,
        state: &mut AppState,
        loader: &AsyncLoader,
    ) -> Option<PanelInteraction> {
        let mut interaction: Option<PanelInteraction> = None;

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            if let Some(header) = header::render_header(ui, state) {
                interaction = Some(PanelInteraction::Header(header));
            }
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            if let Some(pager) = status_bar::render_status_bar(ui, state, loader) {
                interaction = Some(PanelInteraction::Pager(pager));
            }
        });

        let table_frame = egui::Frame::default()
            .inner_margin(egui::Margin::same(4))
            .fill(ctx.style().visuals.panel_fill);

        egui::CentralPanel::default().frame(table_frame).show(ctx, |ui| {
            if let Some(table) = table_panel::render_table_panel(ui, state) {
                interaction = Some(PanelInteraction::Table(table));
            }
        });

        interaction
    }
}

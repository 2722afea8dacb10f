//! Status bar UI rendering
//!
//! Row counts, pagination, jump buttons, activity indicators and the most
//! recent change event.

use crate::app::AppState;
use crate::io::AsyncLoader;
use eframe::egui;
use egui::RichText;
use rvtable::{DataMode, ScrollTarget};

const PAGE_SIZES: &[usize] = &[20, 50, 100, 500, 1_000, 10_000];

/// Result of user interaction with the status bar
pub enum PagerInteraction {
    /// Go to a 1-based page
    Page(usize),
    PageSize(usize),
    ScrollTo(ScrollTarget),
}

/// Renders the status panel at the bottom of the window
///
/// # Arguments
/// * `ui` - The egui UI context for drawing
/// * `state` - Mutable reference to application state
/// * `loader` - Dataset loader, for its progress indicator
///
/// # Returns
/// * `Option<PagerInteraction>` - User interaction result
pub fn render_status_bar(
    ui: &mut egui::Ui,
    state: &mut AppState,
    loader: &AsyncLoader,
) -> Option<PagerInteraction> {
    let mut interaction = None;
    let events = state.recent_events();

    ui.horizontal(|ui| {
        if loader.is_loading() {
            ui.spinner();
            ui.label("Loading dataset…");
        }

        let Some(table) = state.table.as_mut() else {
            if !loader.is_loading() {
                ui.label(RichText::new("No dataset loaded").strong());
            }
            return;
        };

        let mut pagination = table.state().pagination();
        if table.state().config().mode == DataMode::Sync {
            pagination.total = table.projection().total;
        }
        let visible = table.visible_rows().len();
        let source = match &state.dataset_path {
            Some(path) => path.display().to_string(),
            None => "Generated".to_string(),
        };
        ui.label(RichText::new(format!("{source} | {} rows | {visible} visible", pagination.total)).strong());

        ui.separator();

        let pages = pagination.page_count().max(1);
        if ui.add_enabled(pagination.current > 1, egui::Button::new("◀")).clicked() {
            interaction = Some(PagerInteraction::Page(pagination.current - 1));
        }
        ui.label(format!("Page {} / {pages}", pagination.current));
        if ui.add_enabled(pagination.current < pages, egui::Button::new("▶")).clicked() {
            interaction = Some(PagerInteraction::Page(pagination.current + 1));
        }

        let mut page_size = pagination.page_size;
        egui::ComboBox::from_id_salt("page_size")
            .selected_text(format!("{page_size} / page"))
            .show_ui(ui, |ui| {
                for &size in PAGE_SIZES {
                    ui.selectable_value(&mut page_size, size, size.to_string());
                }
            });
        if page_size != pagination.page_size {
            interaction = Some(PagerInteraction::PageSize(page_size));
        }

        ui.separator();

        if ui.button("⤒").on_hover_text("Scroll to top").clicked() {
            interaction = Some(PagerInteraction::ScrollTo(ScrollTarget::Index(0)));
        }
        if ui.button("⤓").on_hover_text("Scroll to bottom").clicked() {
            interaction = Some(PagerInteraction::ScrollTo(ScrollTarget::End));
        }

        if table.is_busy() || table.state().is_loading() {
            ui.spinner();
        }

        if let Some(event) = events.last() {
            ui.separator();
            ui.label(RichText::new(event).weak());
        }

        if let Some(message) = &state.status_message {
            ui.separator();
            ui.label(message);
        }
    });

    interaction
}

//! Light / dark visuals.

use crate::app::AppState;

pub struct ThemeCoordinator;

impl ThemeCoordinator {
    /// Applies the current visuals. Called every frame; egui skips the work
    /// when nothing changed.
    pub fn apply_current_theme(ctx: &egui::Context, state: &AppState) {
        let visuals = if state.settings.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        if ctx.style().visuals.dark_mode != visuals.dark_mode {
            ctx.set_visuals(visuals);
        }
    }
}

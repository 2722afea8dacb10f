//! Header panel UI rendering
//!
//! Top bar with dataset controls, search, templates, column visibility and
//! the theme toggle.

use crate::app::AppState;
use eframe::egui;
use egui::Color32;
use rvtable::{ColumnDef, ColumnKey, DataMode};
use std::path::PathBuf;

/// Result of user interaction with the header panel
pub enum HeaderInteraction {
    /// User picked a dataset file
    OpenFileRequested(PathBuf),
    /// User asked for a generated dataset
    OpenDemoRequested,
    /// User picked an export destination
    ExportRequested(PathBuf),
    /// User pressed Enter in the search box
    SearchSubmitted(String),
    ReloadRequested,
    SaveTemplate { name: String, favorite: bool },
    ApplyTemplate(String),
    DeleteTemplate(String),
    SetFavorite { id: String, favorite: bool },
    ColumnVisibility { key: ColumnKey, visible: bool },
}

/// Renders the application header
///
/// # Arguments
/// * `ui` - The egui UI context for drawing
/// * `state` - Mutable reference to application state
///
/// # Returns
/// * `Option<HeaderInteraction>` - User interaction result
pub fn render_header(ui: &mut egui::Ui, state: &mut AppState) -> Option<HeaderInteraction> {
    let mut interaction = None;

    ui.horizontal(|ui| {
        if ui.button("📁 Open").clicked() {
            let mut dialog = rfd::FileDialog::new().add_filter("Table datasets", &["json"]);
            if let Ok(cwd) = std::env::current_dir() {
                dialog = dialog.set_directory(cwd);
            }
            if let Some(path) = dialog.pick_file() {
                interaction = Some(HeaderInteraction::OpenFileRequested(path));
            }
        }

        if ui.button("🔮 Demo").clicked() {
            interaction = Some(HeaderInteraction::OpenDemoRequested);
        }

        egui::ComboBox::from_id_salt("data_mode")
            .selected_text(match state.settings.mode {
                DataMode::Sync => "Local",
                DataMode::Async => "Remote",
            })
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut state.settings.mode, DataMode::Sync, "Local");
                ui.selectable_value(&mut state.settings.mode, DataMode::Async, "Remote");
            })
            .response
            .on_hover_text("Applies to the next dataset load");

        ui.separator();

        if let Some(table) = state.table.as_ref() {
            if ui.button("💾 Export").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Excel workbook", &["xlsx"])
                    .set_file_name("table.xlsx")
                    .save_file()
                {
                    interaction = Some(HeaderInteraction::ExportRequested(path));
                }
            }
            if ui.button("⟳ Reload").clicked() {
                interaction = Some(HeaderInteraction::ReloadRequested);
            }

            ui.separator();

            let search = egui::TextEdit::singleline(&mut state.search_text)
                .hint_text("🔍 Search")
                .desired_width(180.0)
                .show(ui);
            let enter_pressed = ui.input(|i| i.key_pressed(egui::Key::Enter));
            if search.response.lost_focus() && enter_pressed {
                interaction = Some(HeaderInteraction::SearchSubmitted(state.search_text.clone()));
            }

            ui.menu_button("Templates", |ui| {
                let active = table.state().active_template();
                for template in table.state().templates() {
                    ui.horizontal(|ui| {
                        let label = if active == Some(template.id.as_str()) {
                            egui::RichText::new(&template.name).strong()
                        } else {
                            egui::RichText::new(&template.name)
                        };
                        if ui.button(label).clicked() {
                            interaction = Some(HeaderInteraction::ApplyTemplate(template.id.clone()));
                        }
                        let star = if template.favorite { "★" } else { "☆" };
                        if ui.small_button(star).on_hover_text("Apply on load").clicked() {
                            interaction = Some(HeaderInteraction::SetFavorite {
                                id: template.id.clone(),
                                favorite: !template.favorite,
                            });
                        }
                        if ui.small_button("🗑").clicked() {
                            interaction = Some(HeaderInteraction::DeleteTemplate(template.id.clone()));
                        }
                    });
                }
                if !table.state().templates().is_empty() {
                    ui.separator();
                }
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut state.template_name)
                            .hint_text("Template name")
                            .desired_width(120.0),
                    );
                    ui.checkbox(&mut state.template_favorite, "★");
                    let name = state.template_name.trim();
                    if ui.add_enabled(!name.is_empty(), egui::Button::new("Save")).clicked() {
                        interaction = Some(HeaderInteraction::SaveTemplate {
                            name: name.to_string(),
                            favorite: state.template_favorite,
                        });
                        state.template_name.clear();
                    }
                });
            });

            ui.menu_button("Columns", |ui| {
                for column in table.state().columns() {
                    column_checkbox(ui, table.state(), column, &mut interaction);
                    if !column.is_leaf() {
                        ui.indent(column.identity(), |ui| {
                            for child in &column.children {
                                column_checkbox(ui, table.state(), child, &mut interaction);
                            }
                        });
                    }
                }
            });
        }

        // Push theme toggle to the right
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let label = if state.settings.dark_mode { "🌙 Dark" } else { "☀ Light" };
            if ui.button(label).clicked() {
                state.settings.dark_mode = !state.settings.dark_mode;
                ui.ctx().request_repaint();
            }
        });
    });

    if let Some(err) = &state.error_message {
        ui.colored_label(Color32::RED, err);
    }

    interaction
}

fn column_checkbox(
    ui: &mut egui::Ui,
    table: &rvtable::TableState,
    column: &ColumnDef,
    interaction: &mut Option<HeaderInteraction>,
) {
    let mut visible = !table.is_hidden(&column.key);
    if ui.checkbox(&mut visible, &column.title).changed() {
        *interaction = Some(HeaderInteraction::ColumnVisibility {
            key: column.key.clone(),
            visible,
        });
    }
}

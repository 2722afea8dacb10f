//! Table panel UI rendering
//!
//! Column headers over a virtually scrolled body. Each frame the controller
//! computes the window to materialize; only those rows are laid out, with
//! spacers standing in for the rest so the scrollbar covers the full height.

use crate::app::AppState;
use crate::rendering::row_renderer::{self, RowInteraction};
use crate::ui::table_header::{self, TableHeaderInteraction};
use egui::ScrollArea;
use rvtable::VisibleRow;

/// Result of table panel interactions that need to be handled by the application.
pub enum TablePanelInteraction {
    /// A row's expand toggle was clicked
    ExpandToggled { key: String, was_expanded: bool },
    Header(TableHeaderInteraction),
}

/// Height of one materialized row, and of its nested block lines if any.
struct Measured {
    index: usize,
    height: f32,
    nested: Vec<f32>,
}

/// Renders the table panel.
pub fn render_table_panel(ui: &mut egui::Ui, state: &mut AppState) -> Option<TablePanelInteraction> {
    let Some(table) = state.table.as_mut() else {
        ui.centered_and_justified(|ui| {
            ui.label("Open a dataset or generate a demo to begin");
        });
        return None;
    };

    let layout = table.layout().clone();
    let sorters = table.state().sorters().clone();
    let mut interaction = None;

    ScrollArea::horizontal().id_salt("table_columns").show(ui, |ui| {
        ui.set_min_width(layout.total_width());
        if let Some(header) = table_header::render_table_header(ui, &layout, &sorters) {
            interaction = Some(TablePanelInteraction::Header(header));
        }

        if layout.leaves.is_empty() {
            ui.label("All columns are hidden");
            return;
        }
        if table.state().is_loading() && table.visible_rows().is_empty() {
            ui.spinner();
            return;
        }

        let viewport_height = ui.available_height();
        let outcome = table.frame(viewport_height);
        let programmatic = table.is_scrolling() || outcome.as_ref().is_some_and(|o| o.settled);
        if table.is_scrolling() {
            ui.ctx().request_repaint();
        }

        let window = table.window();
        let total_height = table.heights().computed_height();
        let rows: Vec<VisibleRow> = table.window_rows(window).to_vec();

        let mut area = ScrollArea::vertical().id_salt("table_rows").auto_shrink([false, false]);
        if let Some(outcome) = outcome.filter(|_| programmatic) {
            area = area.vertical_scroll_offset(outcome.scroll_top);
        }

        let mut measured = Vec::with_capacity(rows.len());
        let output = area.show(ui, |ui| {
            ui.spacing_mut().item_spacing.y = 0.0;
            ui.set_min_height(total_height);
            ui.add_space(window.top_offset);

            for (i, row) in rows.iter().enumerate() {
                let index = window.head + i;
                let top = ui.cursor().min.y;
                let node = table.state().rows().get(&row.key);
                if let Some(RowInteraction::ExpandToggled { key, was_expanded }) =
                    row_renderer::render_row(ui, row, node, &layout, index)
                {
                    interaction = Some(TablePanelInteraction::ExpandToggled { key, was_expanded });
                }
                let row_height = ui.cursor().min.y - top;

                let nested = match node.and_then(|n| n.nested()) {
                    Some(nested) if row.expanded && row.has_nested => {
                        row_renderer::render_nested_table(ui, nested, row.depth)
                    }
                    _ => Vec::new(),
                };
                measured.push(Measured { index, height: row_height, nested });
            }
        });

        for Measured { index, height, nested } in measured {
            if nested.is_empty() {
                table.record_row_height(index, height);
            } else {
                table.record_block_height(index, height, &nested);
            }
        }

        let offset = output.state.offset;
        if !programmatic && (offset.y - table.heights().scroll_top()).abs() > 0.5 {
            table.on_scroll(offset.y, offset.x);
            ui.ctx().request_repaint();
        }
    });

    interaction
}

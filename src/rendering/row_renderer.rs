//! Table row rendering.
//!
//! Rows are painted directly with the painter: one allocation per row,
//! cells laid out along the visible leaf columns, and tree guides drawn
//! from each row's branch context.

use crate::rendering::text_utils::paint_truncated;
use eframe::egui;
use rvtable::{ColumnLayout, FieldType, FieldTypeRegistry, NestedTable, RowKey, RowKind, RowNode, VisibleRow};

/// Height of a table row in pixels.
pub const ROW_HEIGHT: f32 = 24.0;

/// Height of one line of a nested table fragment.
pub const NESTED_ROW_HEIGHT: f32 = 20.0;

/// Horizontal indentation per tree level.
pub const INDENT: f32 = 16.0;

const TOGGLE_WIDTH: f32 = 16.0;

/// Result of user interaction with a row.
pub enum RowInteraction {
    ExpandToggled { key: RowKey, was_expanded: bool },
}

/// Draws tree guide lines for a row at `depth`.
fn paint_branch_lines(
    painter: &egui::Painter,
    origin: egui::Pos2,
    depth: usize,
    branch_context: &[bool],
    is_last_child: bool,
    color: egui::Color32,
) {
    let stroke = egui::Stroke::new(1.0, color);
    let bottom = origin.y + ROW_HEIGHT;
    for (level, &continues) in branch_context.iter().enumerate() {
        // The row's own level is drawn as a connector below
        if continues && level + 1 < depth {
            let x = origin.x + level as f32 * INDENT + INDENT / 2.0;
            painter.line_segment([egui::pos2(x, origin.y), egui::pos2(x, bottom)], stroke);
        }
    }
    if depth > 0 {
        let x = origin.x + (depth - 1) as f32 * INDENT + INDENT / 2.0;
        let mid = origin.y + ROW_HEIGHT / 2.0;
        let end = if is_last_child { mid } else { bottom };
        painter.line_segment([egui::pos2(x, origin.y), egui::pos2(x, end)], stroke);
        painter.line_segment([egui::pos2(x, mid), egui::pos2(x + INDENT / 2.0, mid)], stroke);
    }
}

/// Renders one visible row.
///
/// # Arguments
/// * `ui` - Vertical layout inside the scroll area
/// * `row` - Flattened row metadata
/// * `node` - The row's data (the parent's, for a loading placeholder)
/// * `layout` - Visible columns
/// * `row_index` - Absolute index in the visible list
///
/// # Returns
/// The interaction, if the expand toggle was clicked.
pub fn render_row(
    ui: &mut egui::Ui,
    row: &VisibleRow,
    node: Option<&RowNode>,
    layout: &ColumnLayout,
    row_index: usize,
) -> Option<RowInteraction> {
    let width = layout.total_width().max(ui.available_width());
    let (rect, _) = ui.allocate_exact_size(egui::vec2(width, ROW_HEIGHT), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    let text_color = ui.visuals().text_color();
    let guide_color = text_color.gamma_multiply(0.4);

    if row_index % 2 == 1 {
        painter.rect_filled(rect, 0.0, ui.visuals().faint_bg_color);
    }

    if row.kind == RowKind::LoadingPlaceholder {
        let indent = (row.depth + 1) as f32 * INDENT + TOGGLE_WIDTH;
        let text_rect = egui::Rect::from_min_max(rect.min + egui::vec2(indent, 0.0), rect.max);
        paint_truncated(&painter, text_rect, "⏳ Loading…", &egui::FontId::proportional(13.0), guide_color);
        return None;
    }
    let node = node?;

    paint_branch_lines(&painter, rect.min, row.depth, &row.branch_context, row.is_last_child, guide_color);

    let mut interaction = None;
    let font_id = egui::FontId::proportional(13.0);
    let mut x = rect.min.x;
    for (column_index, column) in layout.leaves.iter().enumerate() {
        let mut cell = egui::Rect::from_min_size(egui::pos2(x, rect.min.y), egui::vec2(column.width, ROW_HEIGHT));
        x += column.width;

        if column_index == 0 {
            let indent = row.depth as f32 * INDENT;
            if row.has_children {
                let toggle = egui::Rect::from_min_size(
                    egui::pos2(cell.min.x + indent, cell.min.y),
                    egui::vec2(TOGGLE_WIDTH, ROW_HEIGHT),
                );
                let response = ui.interact(toggle, ui.id().with(("expand", &row.key)), egui::Sense::click());
                if response.clicked() {
                    interaction = Some(RowInteraction::ExpandToggled {
                        key: row.key.clone(),
                        was_expanded: row.expanded,
                    });
                }
                let symbol = if row.expanded { "▼" } else { "▶" };
                painter.text(
                    toggle.center(),
                    egui::Align2::CENTER_CENTER,
                    symbol,
                    egui::FontId::proportional(11.0),
                    text_color,
                );
            }
            cell.min.x += indent + TOGGLE_WIDTH;
        }

        let text = column.render_cell(node, row_index);
        paint_truncated(&painter, cell, &text, &font_id, text_color);
        painter.line_segment(
            [egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)],
            egui::Stroke::new(1.0, guide_color.gamma_multiply(0.5)),
        );
    }

    interaction
}

/// Renders the nested table shown beneath an expanded row.
///
/// # Returns
/// Height of each painted line (header first), for block measurement.
pub fn render_nested_table(ui: &mut egui::Ui, table: &NestedTable, depth: usize) -> Vec<f32> {
    let registry = FieldTypeRegistry::shared();
    let indent = (depth + 1) as f32 * INDENT + TOGGLE_WIDTH;
    let column_width = 160.0;
    let text_color = ui.visuals().text_color();
    let header_color = ui.visuals().strong_text_color();
    let font_id = egui::FontId::proportional(12.0);
    let mut heights = Vec::with_capacity(table.rows.len() + 1);

    let mut paint_line = |ui: &mut egui::Ui, cells: Vec<String>, color: egui::Color32| {
        let width = indent + column_width * cells.len() as f32;
        let (rect, _) = ui.allocate_exact_size(egui::vec2(width, NESTED_ROW_HEIGHT), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        for (i, text) in cells.iter().enumerate() {
            let cell = egui::Rect::from_min_size(
                egui::pos2(rect.min.x + indent + i as f32 * column_width, rect.min.y),
                egui::vec2(column_width, NESTED_ROW_HEIGHT),
            );
            paint_truncated(&painter, cell, text, &font_id, color);
        }
        heights.push(NESTED_ROW_HEIGHT);
    };

    paint_line(ui, table.columns.iter().map(|c| c.title.clone()).collect(), header_color);
    for row in &table.rows {
        let cells = table
            .columns
            .iter()
            .map(|column| {
                row.value(&column.field)
                    .map(|value| registry.get(column.field_type).to_display_string(value))
                    .unwrap_or_default()
            })
            .collect();
        paint_line(ui, cells, text_color);
    }
    heights
}

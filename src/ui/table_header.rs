//! Table header component rendering
//!
//! Multi-level headers: group titles span their leaf columns, leaf titles
//! carry the sort indicator and a resize handle on their right edge.

use crate::rendering::text_utils::paint_truncated;
use eframe::egui;
use rvtable::{ColumnKey, ColumnLayout, HeaderCell, RenderColumn, SortDirection, SortSpec};

/// Height of one header level in pixels.
pub const HEADER_ROW_HEIGHT: f32 = 24.0;

const HANDLE_WIDTH: f32 = 8.0;

/// Result of user interaction with the column headers
pub enum TableHeaderInteraction {
    /// A sortable leaf title was clicked
    SortClicked(ColumnKey),
    /// A resize handle was dragged
    Resized { key: ColumnKey, width: f32 },
    Hide(ColumnKey),
    /// Move `from` to the position of its sibling `to`
    Move { from: ColumnKey, to: ColumnKey },
}

/// Finds the siblings list holding `key` and its position in it.
fn siblings_of<'a>(columns: &'a [RenderColumn], key: &str) -> Option<(&'a [RenderColumn], usize)> {
    if let Some(index) = columns.iter().position(|c| c.key == key) {
        return Some((columns, index));
    }
    columns.iter().find_map(|c| siblings_of(&c.children, key))
}

/// Renders the column headers
///
/// # Arguments
/// * `ui` - The egui UI context for drawing
/// * `layout` - Visible column layout
/// * `sorters` - Active sort, for direction arrows
///
/// # Returns
/// * `Option<TableHeaderInteraction>` - User interaction result
pub fn render_table_header(
    ui: &mut egui::Ui,
    layout: &ColumnLayout,
    sorters: &SortSpec,
) -> Option<TableHeaderInteraction> {
    let levels = layout.depth().max(1);
    let start_pos = ui.cursor().min;
    let (header_rect, _) = ui.allocate_exact_size(
        egui::vec2(layout.total_width(), levels as f32 * HEADER_ROW_HEIGHT),
        egui::Sense::hover(),
    );

    // Left edge of every leaf column, plus the right edge of the last one
    let mut edges = Vec::with_capacity(layout.leaves.len() + 1);
    let mut x = start_pos.x;
    edges.push(x);
    for leaf in &layout.leaves {
        x += leaf.width;
        edges.push(x);
    }

    let painter = ui.painter_at(header_rect);
    let font_id = egui::FontId::proportional(14.0);
    let text_color = ui.visuals().strong_text_color();
    let border = egui::Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color);
    let mut interaction = None;

    for cell in layout.header_rows.iter().flatten() {
        let (Some(&left), Some(&right)) = (edges.get(cell.col_start), edges.get(cell.col_start + cell.col_span))
        else {
            continue;
        };
        let rect = egui::Rect::from_min_max(
            egui::pos2(left, start_pos.y + cell.row as f32 * HEADER_ROW_HEIGHT),
            egui::pos2(right, start_pos.y + (cell.row + cell.row_span) as f32 * HEADER_ROW_HEIGHT),
        );
        painter.rect_filled(rect, 0.0, ui.visuals().faint_bg_color);
        painter.rect_stroke(rect, 0.0, border, egui::StrokeKind::Inside);

        let response = ui.interact(rect, ui.id().with(("header", &cell.key)), egui::Sense::click());
        let title = header_title(cell, layout, sorters);
        paint_truncated(&painter, rect.shrink2(egui::vec2(0.0, 2.0)), &title, &font_id, text_color);

        if cell.is_leaf && cell.sort.is_sortable() {
            if response.clicked() {
                interaction = Some(TableHeaderInteraction::SortClicked(cell.key.clone()));
            }
            response.clone().on_hover_cursor(egui::CursorIcon::PointingHand);
        }

        response.context_menu(|ui| {
            if let Some((siblings, index)) = siblings_of(&layout.tree, &cell.key) {
                if index > 0 && ui.button("◀ Move left").clicked() {
                    interaction = Some(TableHeaderInteraction::Move {
                        from: cell.key.clone(),
                        to: siblings[index - 1].key.clone(),
                    });
                }
                if index + 1 < siblings.len() && ui.button("Move right ▶").clicked() {
                    interaction = Some(TableHeaderInteraction::Move {
                        from: cell.key.clone(),
                        to: siblings[index + 1].key.clone(),
                    });
                }
            }
            if ui.button("Hide column").clicked() {
                interaction = Some(TableHeaderInteraction::Hide(cell.key.clone()));
            }
        });
    }

    // Resize handles on leaf right edges
    for (index, leaf) in layout.leaves.iter().enumerate() {
        if !leaf.resizable {
            continue;
        }
        let handle_rect = egui::Rect::from_center_size(
            egui::pos2(edges[index + 1], header_rect.center().y),
            egui::vec2(HANDLE_WIDTH, header_rect.height()),
        );
        let response = ui.interact(handle_rect, ui.id().with(("resize", &leaf.key)), egui::Sense::drag());
        if response.hovered() || response.dragged() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
        }
        if response.dragged() {
            let delta = response.drag_delta().x;
            if delta != 0.0 {
                interaction = Some(TableHeaderInteraction::Resized {
                    key: leaf.key.clone(),
                    width: (leaf.width + delta).max(leaf.min_width),
                });
            }
        }
    }

    interaction
}

fn header_title(cell: &HeaderCell, layout: &ColumnLayout, sorters: &SortSpec) -> String {
    let direction = layout
        .leaf_by_key(&cell.key)
        .filter(|_| cell.is_leaf)
        .and_then(|leaf| sorters.direction_of(&leaf.field));
    match direction {
        Some(SortDirection::Ascend) => format!("{} ▲", cell.title),
        Some(SortDirection::Descend) => format!("{} ▼", cell.title),
        None => cell.title.clone(),
    }
}

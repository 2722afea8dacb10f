//! Text drawing helpers.

use eframe::egui;
use egui::text::{LayoutJob, TextWrapping};

/// Horizontal padding inside a cell, per side.
pub const CELL_PADDING: f32 = 4.0;

/// Paints `text` left-aligned and vertically centered in `rect`, cut with
/// an ellipsis when it does not fit.
pub fn paint_truncated(
    painter: &egui::Painter,
    rect: egui::Rect,
    text: &str,
    font_id: &egui::FontId,
    color: egui::Color32,
) {
    let max_width = rect.width() - 2.0 * CELL_PADDING;
    if max_width <= 0.0 || text.is_empty() {
        return;
    }
    let mut job = LayoutJob::simple_singleline(text.to_owned(), font_id.clone(), color);
    job.wrap = TextWrapping {
        max_width,
        max_rows: 1,
        break_anywhere: true,
        overflow_character: Some('…'),
    };
    let galley = painter.layout_job(job);
    let pos = egui::pos2(
        rect.min.x + CELL_PADDING,
        rect.center().y - galley.size().y / 2.0,
    );
    painter.galley(pos, galley, color);
}

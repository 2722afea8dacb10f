//! Low-level drawing for table rows.
//!
//! - Row rendering (tree guides, expand toggle, cells, nested fragments)
//! - Text utilities (single-line truncation)

pub mod row_renderer;
pub mod text_utils;

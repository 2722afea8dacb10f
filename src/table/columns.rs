//! Render-ready column layout.
//!
//! Turns raw (possibly grouped) column definitions into the ordered tree
//! the renderer draws: hidden columns removed, widths resolved, default
//! renderers injected, top-level columns grouped fixed-left / floating /
//! fixed-right, and one header row per tree level.

use crate::field_types::{FieldKind, FieldTypeRegistry};
use crate::model::{ColumnDef, ColumnKey, FixedPosition, RowNode, SortConfig};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Everything a cell renderer may look at.
pub struct CellContext<'a> {
    /// Value at the column's field path, if present
    pub value: Option<&'a Value>,
    pub row: &'a RowNode,
    pub column: &'a RenderColumn,
    /// Position of the row in the visible list
    pub row_index: usize,
}

/// Produces the text of one cell.
pub type CellRenderer = Arc<dyn Fn(&CellContext<'_>) -> String + Send + Sync>;

/// Renderer used when a column supplies none: the field type's display string.
pub fn default_renderer(kind: FieldKind, registry: &FieldTypeRegistry) -> CellRenderer {
    let field_type = registry.get_shared(kind);
    Arc::new(move |ctx: &CellContext<'_>| match ctx.value {
        Some(value) => field_type.to_display_string(value),
        None => String::new(),
    })
}

/// A column after layout.
#[derive(Clone)]
pub struct RenderColumn {
    pub key: ColumnKey,
    pub field: String,
    pub title: String,
    /// Resolved pixel width; groups span their children
    pub width: f32,
    pub min_width: f32,
    pub fixed: FixedPosition,
    pub sort: SortConfig,
    pub field_type: FieldKind,
    /// Only top-level leaves can be resized
    pub resizable: bool,
    pub draggable: bool,
    /// Header tree depth (0 = top level)
    pub depth: usize,
    pub children: Vec<RenderColumn>,
    pub renderer: CellRenderer,
}

impl fmt::Debug for RenderColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderColumn")
            .field("key", &self.key)
            .field("width", &self.width)
            .field("fixed", &self.fixed)
            .field("depth", &self.depth)
            .field("children", &self.children)
            .finish()
    }
}

impl RenderColumn {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of leaf columns this header spans.
    pub fn leaf_span(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(RenderColumn::leaf_span).sum()
        }
    }

    /// Renders the cell of `row` in this column.
    pub fn render_cell(&self, row: &RowNode, row_index: usize) -> String {
        let ctx = CellContext {
            value: row.value(&self.field),
            row,
            column: self,
            row_index,
        };
        (self.renderer)(&ctx)
    }
}

/// One header cell, positioned on the leaf grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub key: ColumnKey,
    pub title: String,
    /// First leaf column covered
    pub col_start: usize,
    pub col_span: usize,
    /// Header row (tree depth)
    pub row: usize,
    /// Leaves stretch down to the last header row
    pub row_span: usize,
    pub is_leaf: bool,
    pub fixed: FixedPosition,
    pub sort: SortConfig,
}

/// Result of laying out a column tree.
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    /// Visible column tree in render order
    pub tree: Vec<RenderColumn>,
    /// Visible leaves in render order
    pub leaves: Vec<RenderColumn>,
    /// Header rows, one per tree level
    pub header_rows: Vec<Vec<HeaderCell>>,
}

impl ColumnLayout {
    /// Sum of leaf widths.
    pub fn total_width(&self) -> f32 {
        self.leaves.iter().map(|c| c.width).sum()
    }

    pub fn depth(&self) -> usize {
        self.header_rows.len()
    }

    pub fn leaf_by_key(&self, key: &str) -> Option<&RenderColumn> {
        self.leaves.iter().find(|c| c.key == key)
    }
}

/// Builds the render layout for a column tree.
///
/// # Arguments
/// * `defs` - Raw column definitions
/// * `hidden` - Keys of hidden columns; hiding a group hides its subtree
/// * `widths` - User-resized widths by key
/// * `registry` - Field types for default renderers and widths
///
/// # Returns
/// The layout; groups with no visible children are dropped.
pub fn build_columns(
    defs: &[ColumnDef],
    hidden: &HashSet<ColumnKey>,
    widths: &HashMap<ColumnKey, f32>,
    registry: &FieldTypeRegistry,
) -> ColumnLayout {
    let mut tree: Vec<RenderColumn> = defs
        .iter()
        .filter_map(|def| layout_column(def, 0, def.fixed, hidden, widths, registry))
        .collect();
    // Stable: relative order inside each group is kept
    tree.sort_by_key(|column| column.fixed.rank());

    let mut leaves = Vec::new();
    for column in &tree {
        collect_render_leaves(column, &mut leaves);
    }

    let depth = tree.iter().map(subtree_depth).max().unwrap_or(0);
    let mut header_rows: Vec<Vec<HeaderCell>> = vec![Vec::new(); depth];
    let mut col_start = 0;
    for column in &tree {
        col_start = push_header_cells(column, col_start, depth, &mut header_rows);
    }

    ColumnLayout { tree, leaves, header_rows }
}

fn layout_column(
    def: &ColumnDef,
    depth: usize,
    fixed: FixedPosition,
    hidden: &HashSet<ColumnKey>,
    widths: &HashMap<ColumnKey, f32>,
    registry: &FieldTypeRegistry,
) -> Option<RenderColumn> {
    if hidden.contains(&def.key) {
        return None;
    }

    let renderer = match &def.renderer {
        Some(renderer) => Arc::clone(renderer),
        None => default_renderer(def.field_type, registry),
    };

    if def.is_leaf() {
        let width = widths
            .get(&def.key)
            .copied()
            .or(def.width)
            .unwrap_or_else(|| registry.get(def.field_type).default_width())
            .max(def.min_width);
        return Some(RenderColumn {
            key: def.key.clone(),
            field: def.field.clone(),
            title: def.title.clone(),
            width,
            min_width: def.min_width,
            fixed,
            sort: def.sort,
            field_type: def.field_type,
            resizable: depth == 0 && def.resizable,
            draggable: def.draggable,
            depth,
            children: Vec::new(),
            renderer,
        });
    }

    let children: Vec<RenderColumn> = def
        .children
        .iter()
        .filter_map(|child| layout_column(child, depth + 1, fixed, hidden, widths, registry))
        .collect();
    if children.is_empty() {
        return None;
    }
    let width = children.iter().map(|c| c.width).sum();
    Some(RenderColumn {
        key: def.key.clone(),
        field: def.field.clone(),
        title: def.title.clone(),
        width,
        min_width: def.min_width,
        fixed,
        sort: SortConfig::Disabled,
        field_type: def.field_type,
        resizable: false,
        draggable: def.draggable,
        depth,
        children,
        renderer,
    })
}

fn collect_render_leaves(column: &RenderColumn, out: &mut Vec<RenderColumn>) {
    if column.is_leaf() {
        out.push(column.clone());
    } else {
        for child in &column.children {
            collect_render_leaves(child, out);
        }
    }
}

fn subtree_depth(column: &RenderColumn) -> usize {
    1 + column.children.iter().map(subtree_depth).max().unwrap_or(0)
}

/// Appends header cells for a column subtree. Returns the next leaf index.
fn push_header_cells(
    column: &RenderColumn,
    col_start: usize,
    total_depth: usize,
    rows: &mut [Vec<HeaderCell>],
) -> usize {
    let span = column.leaf_span();
    let row_span = if column.is_leaf() { total_depth - column.depth } else { 1 };
    rows[column.depth].push(HeaderCell {
        key: column.key.clone(),
        title: column.title.clone(),
        col_start,
        col_span: span,
        row: column.depth,
        row_span,
        is_leaf: column.is_leaf(),
        fixed: column.fixed,
        sort: column.sort,
    });
    let mut next = col_start;
    for child in &column.children {
        next = push_header_cells(child, next, total_depth, rows);
    }
    col_start + span
}

// ===== Drag Reorder =====

/// Relocates column `from` to the position of its drop target `to` and
/// re-indexes every sibling's `order`.
///
/// Both keys must be siblings (same parent, or both top level). Otherwise,
/// or when the dragged column is not draggable, the definitions are
/// returned unchanged.
pub fn move_column(defs: &[ColumnDef], from: &str, to: &str) -> Vec<ColumnDef> {
    let mut columns = defs.to_vec();
    if from == to || !move_among_siblings(&mut columns, from, to) {
        log::debug!("column move {from:?} -> {to:?} ignored");
    }
    columns
}

fn move_among_siblings(siblings: &mut Vec<ColumnDef>, from: &str, to: &str) -> bool {
    let from_index = siblings.iter().position(|c| c.key == from);
    let to_index = siblings.iter().position(|c| c.key == to);
    match (from_index, to_index) {
        (Some(from_index), Some(to_index)) => {
            if !siblings[from_index].draggable || from_index == to_index {
                return false;
            }
            let column = siblings.remove(from_index);
            siblings.insert(to_index, column);
            reindex_order(siblings);
            true
        }
        (None, None) => siblings
            .iter_mut()
            .any(|column| move_among_siblings(&mut column.children, from, to)),
        _ => false,
    }
}

/// Sets every column's `order` to its position among its siblings.
pub(crate) fn reindex_order(siblings: &mut [ColumnDef]) {
    for (index, column) in siblings.iter_mut().enumerate() {
        column.order = index;
    }
}

/// `reindex_order` applied at every level of the tree.
pub(crate) fn reindex_tree(columns: &mut [ColumnDef]) {
    reindex_order(columns);
    for column in columns.iter_mut() {
        reindex_tree(&mut column.children);
    }
}

//! Table state machine and the views derived from it.
//!
//! This module contains:
//! - `state`: the immutable `TableState` snapshot
//! - `reducer`: `TableAction` transitions and template recovery
//! - `columns`: column layout (ordering, widths, header rows, renderers)
//! - `projector`: local search → filter → sort → page
//! - `flatten`: projected tree to display rows

mod state;
mod reducer;
mod columns;
mod projector;
mod flatten;

pub use state::TableState;
pub use reducer::{
    reduce, reduce_with, recovery_state, ColumnOrderStrategy, PreserveColumnOrder, TableAction,
};
pub use columns::{
    build_columns, default_renderer, move_column, CellContext, CellRenderer, ColumnLayout,
    HeaderCell, RenderColumn,
};
pub use projector::{project, Projection};
pub use flatten::{flatten, RowKind, VisibleRow};

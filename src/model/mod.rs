//! Data model shared by the state machine, projector and exporter.
//!
//! - Column definitions (nested header groups, fixed positions, sort config)
//! - Rows and the keyed row arena
//! - Sort, filter and pagination parameters
//! - Saved view templates

mod column;
mod row;
mod query;
mod template;

pub use column::{ColumnDef, ColumnKey, FixedPosition, SortConfig};
pub(crate) use column::collect_leaves;
pub use row::{Row, RowKey, RowNode, RowStore, NestedTable};
pub use query::{SortDirection, SortEntry, SortSpec, SorterInput, FilterSpec, Pagination};
pub use template::{Template, TemplateColumn};
pub(crate) use template::enforce_single_favorite;

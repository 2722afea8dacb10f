pub mod error;
pub mod config;
pub mod model;
pub mod field_types;
pub mod virtual_scroll;
pub mod table;
pub mod providers;
pub mod requests;
pub mod controller;
pub mod export;
pub mod dataset;
pub mod template_store;
pub mod demo;

// Export error and config
pub use error::{TableError, Result};
pub use config::{TableConfig, DataMode};

// Export data model
pub use model::{
    ColumnDef, ColumnKey, FixedPosition, SortConfig,
    Row, RowKey, RowNode, RowStore, NestedTable,
    SortDirection, SortEntry, SortSpec, SorterInput, FilterSpec, Pagination,
    Template, TemplateColumn,
};

// Export field type support
pub use field_types::{FieldKind, FieldType, FieldTypeRegistry, SheetCell};

// Export windowing
pub use virtual_scroll::{
    RowHeightTracker, WindowState, WindowAnchor, compute_window, offset_of_index,
    ScrollEventCoordinator, ScrollEvent, ScrollTarget, ScrollPhase, ScrollHandle, FrameOutcome,
};

// Export table state machine and derived views
pub use table::{
    TableState, TableAction, reduce, reduce_with, recovery_state, ColumnOrderStrategy,
    PreserveColumnOrder, ColumnLayout, default_renderer, RenderColumn, HeaderCell, CellContext, CellRenderer, build_columns, move_column,
    Projection, project, VisibleRow, RowKind, flatten,
};

// Export host-facing pieces
pub use providers::{
    CancelToken, FetchRequest, FetchResponse,
    DataProvider, ChildrenProvider, NestedTableProvider, TemplateProvider,
    MemoryDataProvider, simulate_latency,
};
pub use requests::{RequestTracker, Completion, RequestSlot, Waker};
pub use controller::{TableController, TableEvent, ChangeKind};
pub use export::{Exporter, SheetGrid, MergeRange, build_sheet_grid, build_secondary_grid};
pub use dataset::Dataset;
pub use template_store::JsonTemplateStore;
pub use demo::{generate as generate_demo, demo_columns, DemoOptions, DemoChildrenProvider};

//! Virtual scrolling for tables with variable row heights.
//!
//! - `heights`: per-row measured or estimated heights and their running sum
//! - `window`: pure mapping from heights + viewport + offset to a row range
//! - `coordinator`: per-frame serialization of scroll, programmatic and
//!   recompute events

mod heights;
mod window;
mod coordinator;

pub use heights::RowHeightTracker;
pub use window::{compute_window, offset_of_index, WindowAnchor, WindowState};
pub use coordinator::{
    FrameOutcome, ScrollEvent, ScrollEventCoordinator, ScrollHandle, ScrollPhase, ScrollTarget,
};

//! Background loading of datasets for the viewer.

pub mod async_loader;

pub use async_loader::{AsyncLoader, LoadResult};

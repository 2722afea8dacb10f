//! Provider contracts for externally owned data.
//!
//! Providers are plain blocking calls; the request tracker runs them on
//! background threads. A provider that notices its cancel token was set
//! should return `TableError::Aborted`, which is swallowed.

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::field_types::FieldTypeRegistry;
use crate::model::{ColumnDef, FilterSpec, NestedTable, Pagination, Row, SortSpec, SorterInput, Template};
use crate::table::{project, reduce, TableAction, TableState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag for one request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Aborted)` once cancelled, for use with `?`.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TableError::Aborted)
        } else {
            Ok(())
        }
    }
}

/// Parameters forwarded to an asynchronous data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub pagination: Pagination,
    pub sorters: SortSpec,
    pub filters: FilterSpec,
    pub search: String,
}

impl FetchRequest {
    /// Captures the request arguments from a state snapshot.
    pub fn from_state(state: &TableState) -> Self {
        Self {
            pagination: state.pagination(),
            sorters: state.sorters().clone(),
            filters: state.filters().clone(),
            search: state.search().to_string(),
        }
    }
}

/// Partial state returned by a data provider.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// Rows of the requested page (all rows in synchronous mode)
    pub rows: Vec<Row>,
    /// Total matching rows on the provider side
    pub total: Option<usize>,
    /// Replacement column definitions, if the provider owns them
    pub columns: Option<Vec<ColumnDef>>,
}

/// Loads table rows.
pub trait DataProvider: Send + Sync {
    fn fetch(&self, request: &FetchRequest, cancel: &CancelToken) -> Result<FetchResponse>;
}

/// Loads the children of a lazily expanded row.
pub trait ChildrenProvider: Send + Sync {
    fn children(&self, row: &Row, cancel: &CancelToken) -> Result<Vec<Row>>;
}

/// Loads the nested table shown beneath an expanded row.
pub trait NestedTableProvider: Send + Sync {
    fn nested_table(&self, row: &Row, cancel: &CancelToken) -> Result<NestedTable>;
}

/// Loads and persists saved templates.
pub trait TemplateProvider: Send + Sync {
    fn load(&self) -> Result<Vec<Template>>;
    fn save(&self, templates: &[Template]) -> Result<()>;
}

/// Waits `latency`, waking regularly to honor cancellation.
pub fn simulate_latency(latency: Duration, cancel: &CancelToken) -> Result<()> {
    let deadline = Instant::now() + latency;
    while Instant::now() < deadline {
        cancel.check()?;
        std::thread::sleep(Duration::from_millis(5).min(latency));
    }
    cancel.check()
}

/// In-memory provider that answers requests the way a server would:
/// search, filter, sort and page applied on its side.
pub struct MemoryDataProvider {
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
    latency: Duration,
    registry: FieldTypeRegistry,
}

impl MemoryDataProvider {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            latency: Duration::ZERO,
            registry: FieldTypeRegistry::default(),
        }
    }

    /// Simulated response delay.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl DataProvider for MemoryDataProvider {
    fn fetch(&self, request: &FetchRequest, cancel: &CancelToken) -> Result<FetchResponse> {
        simulate_latency(self.latency, cancel)?;

        let state = TableState::new(&TableConfig::default(), self.columns.clone());
        let state = reduce(&state, TableAction::SetRows(self.rows.clone()));
        let state = reduce(&state, TableAction::Search(request.search.clone()));
        let filters: BTreeMap<String, Vec<serde_json::Value>> =
            request.filters.iter().map(|(f, v)| (f.clone(), v.clone())).collect();
        let state = reduce(&state, TableAction::Filter(filters));
        let sorters = request
            .sorters
            .entries()
            .iter()
            .map(|e| SorterInput::new(&e.field, Some(e.direction)))
            .collect();
        let state = reduce(&state, TableAction::Sort(sorters));
        let state = reduce(&state, TableAction::Paginate(request.pagination));
        cancel.check()?;

        let projection = project(&state, &self.registry);
        let rows = projection
            .roots
            .iter()
            .filter_map(|key| state.rows().subtree(key))
            .collect();
        Ok(FetchResponse {
            rows,
            total: Some(projection.total),
            columns: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_types::FieldKind;
    use crate::model::SortDirection;

    fn provider() -> MemoryDataProvider {
        let rows = (0..30).map(|i| Row::new(&format!("r{i}")).with("n", i)).collect();
        MemoryDataProvider::new(vec![ColumnDef::new("n", "N").with_type(FieldKind::Number).sortable()], rows)
    }

    #[test]
    fn test_memory_provider_pages_and_sorts() {
        let request = FetchRequest {
            pagination: Pagination { current: 2, page_size: 10, total: 0 },
            sorters: SortSpec::single("n", SortDirection::Descend),
            filters: FilterSpec::new(),
            search: String::new(),
        };
        let response = provider().fetch(&request, &CancelToken::new()).unwrap();
        assert_eq!(response.total, Some(30));
        assert_eq!(response.rows.len(), 10);
        assert_eq!(response.rows[0].key, "r19");
    }

    #[test]
    fn test_cancelled_request_aborts() {
        let token = CancelToken::new();
        token.cancel();
        let request = FetchRequest {
            pagination: Pagination::new(10),
            sorters: SortSpec::default(),
            filters: FilterSpec::new(),
            search: String::new(),
        };
        let err = provider().fetch(&request, &token).unwrap_err();
        assert!(err.is_aborted());
    }

    #[test]
    fn test_request_from_state() {
        let state = TableState::new(&TableConfig::default(), vec![ColumnDef::new("n", "N")]);
        let state = reduce(&state, TableAction::Search("q".into()));
        let request = FetchRequest::from_state(&state);
        assert_eq!(request.search, "q");
        assert_eq!(request.pagination.current, 1);
    }
}

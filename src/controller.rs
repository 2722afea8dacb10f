//! Host-facing handle over one table instance.
//!
//! The controller owns the current `TableState`, the row height tracker,
//! the scroll coordinator and the request tracker. All state changes go
//! through `dispatch`, on the thread that owns the controller; provider
//! results are applied when the host calls `poll` once per frame.

use crate::config::{DataMode, TableConfig};
use crate::error::Result;
use crate::export::Exporter;
use crate::field_types::FieldTypeRegistry;
use crate::model::{ColumnDef, FilterSpec, Pagination, RowKey, SortSpec, Template};
use crate::providers::{
    ChildrenProvider, DataProvider, FetchRequest, NestedTableProvider, TemplateProvider,
};
use crate::requests::{Completion, RequestSlot, RequestTracker, Waker};
use crate::table::{
    build_columns, flatten, project, reduce_with, ColumnLayout, ColumnOrderStrategy,
    PreserveColumnOrder, Projection, TableAction, TableState, VisibleRow,
};
use crate::virtual_scroll::{
    FrameOutcome, RowHeightTracker, ScrollEvent, ScrollEventCoordinator, ScrollHandle,
    ScrollTarget, WindowState,
};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// What triggered a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Paginate,
    Sort,
    Filter,
}

/// Notifications delivered to registered listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    Change {
        pagination: Pagination,
        filters: FilterSpec,
        sorters: SortSpec,
        action: ChangeKind,
    },
    Expand {
        expanded: bool,
        key: RowKey,
    },
}

type Listener = Box<dyn FnMut(&TableEvent) + Send>;

/// Derived views, rebuilt when the state revision changes.
#[derive(Default)]
struct DerivedViews {
    revision: Option<u64>,
    layout: ColumnLayout,
    projection: Projection,
    rows: Vec<VisibleRow>,
}

/// Imperative handle over one table.
pub struct TableController {
    state: TableState,
    registry: FieldTypeRegistry,
    order_strategy: Box<dyn ColumnOrderStrategy + Send>,
    data_provider: Option<Arc<dyn DataProvider>>,
    children_provider: Option<Arc<dyn ChildrenProvider>>,
    nested_provider: Option<Arc<dyn NestedTableProvider>>,
    template_provider: Option<Arc<dyn TemplateProvider>>,
    requests: RequestTracker,
    heights: RowHeightTracker,
    scroll: ScrollEventCoordinator,
    listeners: Vec<Listener>,
    views: DerivedViews,
    /// A data fetch waits for templates so a favorite applies first
    fetch_after_templates: bool,
    templates_loaded: bool,
    last_error: Option<String>,
}

impl TableController {
    /// Creates a controller for the given columns.
    pub fn new(config: TableConfig, columns: Vec<ColumnDef>) -> Self {
        let heights = RowHeightTracker::new(config.estimated_row_height);
        let scroll = ScrollEventCoordinator::new(config.overscan);
        Self {
            state: TableState::new(&config, columns),
            registry: FieldTypeRegistry::default(),
            order_strategy: Box::new(PreserveColumnOrder),
            data_provider: None,
            children_provider: None,
            nested_provider: None,
            template_provider: None,
            requests: RequestTracker::new(),
            heights,
            scroll,
            listeners: Vec::new(),
            views: DerivedViews::default(),
            fetch_after_templates: false,
            templates_loaded: false,
            last_error: None,
        }
    }

    pub fn with_registry(mut self, registry: FieldTypeRegistry) -> Self {
        self.registry = registry;
        self.views.revision = None;
        self
    }

    pub fn with_order_strategy(mut self, strategy: Box<dyn ColumnOrderStrategy + Send>) -> Self {
        self.order_strategy = strategy;
        self
    }

    pub fn with_data_provider(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.data_provider = Some(provider);
        self
    }

    pub fn with_children_provider(mut self, provider: Arc<dyn ChildrenProvider>) -> Self {
        self.children_provider = Some(provider);
        self
    }

    pub fn with_nested_provider(mut self, provider: Arc<dyn NestedTableProvider>) -> Self {
        self.nested_provider = Some(provider);
        self
    }

    pub fn with_template_provider(mut self, provider: Arc<dyn TemplateProvider>) -> Self {
        self.template_provider = Some(provider);
        self
    }

    /// Callback run from worker threads when a result is ready.
    pub fn set_waker(&mut self, waker: Waker) {
        self.requests.set_waker(waker);
    }

    /// Registers a listener for change and expand events.
    pub fn on_event(&mut self, listener: impl FnMut(&TableEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ===== Imperative Handle =====

    /// Current state snapshot.
    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Loads data, first fetching templates if a template provider is set
    /// and they were never loaded.
    ///
    /// # Arguments
    /// * `reset_page` - Go back to page 1 before fetching
    pub fn load(&mut self, reset_page: bool) {
        if reset_page {
            self.dispatch(TableAction::ResetPagination { page_size: None });
        }
        if let (false, Some(provider)) = (self.templates_loaded, self.template_provider.clone()) {
            self.fetch_after_templates = true;
            self.requests.spawn(RequestSlot::Templates, move |_| {
                Ok(Completion::Templates(provider.load()?))
            });
            return;
        }
        self.fetch();
    }

    /// Re-issues the data fetch with the current parameters.
    pub fn reload(&mut self) {
        self.load(false);
    }

    /// Merges `patch` into a row's values. Unknown rows are ignored.
    pub fn update_row(&mut self, key: &str, patch: Map<String, Value>) {
        self.dispatch(TableAction::UpdateRow { key: key.to_string(), patch });
    }

    /// Shows a loading placeholder under a row.
    pub fn add_loading_row(&mut self, key: &str) {
        self.dispatch(TableAction::AddLoadingRow(key.to_string()));
    }

    /// Returns to page 1, optionally with a new page size, and refetches
    /// in asynchronous mode.
    pub fn reset_pagination(&mut self, page_size: Option<usize>) {
        self.dispatch(TableAction::ResetPagination { page_size });
        if self.is_async() {
            self.fetch();
        }
    }

    /// Expands or collapses a row, fetching children or a nested table on
    /// first expansion.
    pub fn expand_row(&mut self, expanded: bool, key: &str) {
        let Some(node) = self.state.rows().get(key) else {
            log::debug!("expand of unknown row {key:?} ignored");
            return;
        };
        let row = node.to_row();
        let needs_children = node.needs_children();
        // Rows with inline children never get a nested table
        let needs_nested = node.nested().is_none()
            && !node.is_loading()
            && node.children().map_or(true, <[_]>::is_empty);

        if expanded {
            self.dispatch(TableAction::ExpandRow(key.to_string()));
            if let (true, Some(provider)) = (needs_children, self.children_provider.clone()) {
                self.dispatch(TableAction::AddLoadingRow(key.to_string()));
                let owned_key = key.to_string();
                self.requests.spawn(RequestSlot::Children(owned_key.clone()), move |cancel| {
                    let rows = provider.children(&row, cancel)?;
                    Ok(Completion::Children { key: owned_key, rows })
                });
            } else if let (true, Some(provider)) = (needs_nested, self.nested_provider.clone()) {
                self.dispatch(TableAction::AddLoadingRow(key.to_string()));
                let owned_key = key.to_string();
                self.requests.spawn(RequestSlot::Nested(owned_key.clone()), move |cancel| {
                    let table = provider.nested_table(&row, cancel)?;
                    Ok(Completion::Nested { key: owned_key, table })
                });
            }
        } else {
            self.requests.cancel(&RequestSlot::Children(key.to_string()));
            self.requests.cancel(&RequestSlot::Nested(key.to_string()));
            self.dispatch(TableAction::ClearLoadingRow(key.to_string()));
            self.dispatch(TableAction::CollapseRow(key.to_string()));
        }
        self.emit(TableEvent::Expand { expanded, key: key.to_string() });
    }

    /// Applies one transition, emitting change events and refetching in
    /// asynchronous mode when request parameters changed.
    pub fn dispatch(&mut self, action: TableAction) {
        let change = match &action {
            TableAction::Paginate(_) => Some(ChangeKind::Paginate),
            TableAction::Sort(_) => Some(ChangeKind::Sort),
            TableAction::Filter(_) => Some(ChangeKind::Filter),
            _ => None,
        };
        let refetch = change.is_some()
            || matches!(action, TableAction::Search(_) | TableAction::ApplyTemplate(_));
        let persist = matches!(
            action,
            TableAction::SaveTemplate { .. }
                | TableAction::DeleteTemplate(_)
                | TableAction::SetFavoriteTemplate { .. }
        );

        let before = self.state.revision();
        self.state = reduce_with(&self.state, action, self.order_strategy.as_ref());
        if self.state.revision() == before {
            return;
        }

        if let Some(kind) = change {
            self.emit(TableEvent::Change {
                pagination: self.state.pagination(),
                filters: self.state.filters().clone(),
                sorters: self.state.sorters().clone(),
                action: kind,
            });
        }
        if persist {
            self.persist_templates();
        }
        if refetch && self.is_async() {
            self.fetch();
        }
    }

    // ===== Templates =====

    /// Saves the current view as a new template.
    ///
    /// # Returns
    /// The new template id.
    pub fn save_template(&mut self, name: &str, favorite: bool) -> String {
        let id = Template::generate_id();
        self.dispatch(TableAction::SaveTemplate {
            id: id.clone(),
            name: name.to_string(),
            favorite,
        });
        id
    }

    pub fn delete_template(&mut self, id: &str) {
        self.dispatch(TableAction::DeleteTemplate(id.to_string()));
    }

    pub fn set_favorite_template(&mut self, id: &str, favorite: bool) {
        self.dispatch(TableAction::SetFavoriteTemplate { id: id.to_string(), favorite });
    }

    pub fn apply_template(&mut self, id: &str) {
        self.dispatch(TableAction::ApplyTemplate(id.to_string()));
    }

    fn persist_templates(&self) {
        if let Some(provider) = &self.template_provider {
            if let Err(e) = provider.save(self.state.templates()) {
                log::warn!("failed to save templates: {e}");
            }
        }
    }

    // ===== Requests =====

    fn is_async(&self) -> bool {
        self.state.config().mode == DataMode::Async
    }

    fn fetch(&mut self) {
        let Some(provider) = self.data_provider.clone() else {
            return;
        };
        let request = FetchRequest::from_state(&self.state);
        self.dispatch(TableAction::SetLoading(true));
        self.requests.spawn(RequestSlot::Data, move |cancel| {
            Ok(Completion::Data(provider.fetch(&request, cancel)?))
        });
    }

    /// Whether any provider request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.requests.has_pending()
    }

    /// Applies finished provider requests. Call once per frame.
    ///
    /// # Returns
    /// `true` when the state changed.
    pub fn poll(&mut self) -> bool {
        let completions = self.requests.poll();
        self.apply_completions(completions)
    }

    /// Blocks until outstanding requests finish, then applies them.
    /// Chained requests (templates, then data) are followed too.
    pub fn wait_idle(&mut self, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut changed = false;
        while self.requests.has_pending() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            let completions = self.requests.wait_idle(remaining);
            changed |= self.apply_completions(completions);
        }
        changed
    }

    fn apply_completions(&mut self, completions: Vec<Completion>) -> bool {
        let before = self.state.revision();
        for completion in completions {
            match completion {
                Completion::Data(response) => {
                    if let Some(columns) = response.columns {
                        self.dispatch(TableAction::UpdateColumns(columns));
                    }
                    let total = response.total.unwrap_or(response.rows.len());
                    self.dispatch(TableAction::SetRows(response.rows));
                    self.dispatch(TableAction::SetTotal(total));
                    self.dispatch(TableAction::SetLoading(false));
                    self.last_error = None;
                    self.refetch_expanded_children();
                }
                Completion::Children { key, rows } => {
                    self.dispatch(TableAction::SetRowChildren { key, rows });
                }
                Completion::Nested { key, table } => {
                    self.dispatch(TableAction::SetNestedTable { key, table });
                }
                Completion::Templates(templates) => {
                    self.templates_loaded = true;
                    self.dispatch(TableAction::SetTemplates(templates));
                    if let Some(id) = self.state.favorite_template().map(|t| t.id.clone()) {
                        log::info!("applying favorite template {id}");
                        // Applied before the first fetch; the fetch below
                        // picks up its parameters
                        self.state = reduce_with(
                            &self.state,
                            TableAction::ApplyTemplate(id),
                            self.order_strategy.as_ref(),
                        );
                    }
                    if std::mem::take(&mut self.fetch_after_templates) {
                        self.fetch();
                    }
                }
                Completion::Failed { slot, error } => {
                    log::warn!("request {:?} failed: {}", slot, error);
                    self.last_error = Some(error.to_string());
                    match slot {
                        RequestSlot::Data => self.dispatch(TableAction::SetLoading(false)),
                        RequestSlot::Children(key) | RequestSlot::Nested(key) => {
                            self.dispatch(TableAction::ClearLoadingRow(key))
                        }
                        RequestSlot::Templates => {
                            self.templates_loaded = true;
                            if std::mem::take(&mut self.fetch_after_templates) {
                                self.fetch();
                            }
                        }
                    }
                }
            }
        }
        self.state.revision() != before
    }

    /// After a data reload, expanded lazy rows need their children again.
    fn refetch_expanded_children(&mut self) {
        let pending: Vec<RowKey> = self
            .state
            .expanded()
            .iter()
            .filter(|key| self.state.rows().get(key).is_some_and(|n| n.needs_children()))
            .cloned()
            .collect();
        for key in pending {
            self.expand_row(true, &key);
        }
    }

    /// Last provider failure, for the host's fallback rendering.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ===== Derived Views =====

    fn refresh_views(&mut self) {
        if self.views.revision == Some(self.state.revision()) {
            return;
        }
        let layout = build_columns(
            self.state.columns(),
            self.state.hidden(),
            self.state.widths(),
            &self.registry,
        );
        let projection = project(&self.state, &self.registry);
        let rows = flatten(&self.state, &projection);
        log::trace!("views rebuilt: {} visible rows", rows.len());
        self.views = DerivedViews {
            revision: Some(self.state.revision()),
            layout,
            projection,
            rows,
        };
    }

    pub fn layout(&mut self) -> &ColumnLayout {
        self.refresh_views();
        &self.views.layout
    }

    pub fn projection(&mut self) -> &Projection {
        self.refresh_views();
        &self.views.projection
    }

    /// Flattened rows in display order.
    pub fn visible_rows(&mut self) -> &[VisibleRow] {
        self.refresh_views();
        &self.views.rows
    }

    // ===== Windowing =====

    pub fn heights(&self) -> &RowHeightTracker {
        &self.heights
    }

    pub fn scroll_handle(&self) -> ScrollHandle {
        self.scroll.handle()
    }

    pub fn scroll_to(&mut self, target: ScrollTarget) {
        self.scroll.push(ScrollEvent::Programmatic(target));
    }

    /// Reports a native scroll of the viewport.
    pub fn on_scroll(&mut self, scroll_top: f32, scroll_left: f32) {
        self.scroll.push(ScrollEvent::Native { scroll_top, scroll_left });
    }

    /// Records the rendered height of the row at `index`.
    pub fn record_row_height(&mut self, index: usize, height: f32) {
        if self.heights.record_measured(index, height) {
            self.scroll.push(ScrollEvent::Recompute);
        }
    }

    /// Records a row rendered together with its nested fragment.
    pub fn record_block_height(&mut self, index: usize, row_height: f32, nested_heights: &[f32]) {
        if self.heights.record_block(index, row_height, nested_heights) {
            self.scroll.push(ScrollEvent::Recompute);
        }
    }

    /// Runs one frame of window computation.
    ///
    /// Syncs the height tracker with the visible row count first, then lets
    /// the coordinator process the latest scroll event.
    pub fn frame(&mut self, viewport_height: f32) -> Option<FrameOutcome> {
        self.refresh_views();
        let count = self.views.rows.len();
        if count != self.heights.len() {
            self.heights.sync_len(count);
            self.scroll.push(ScrollEvent::Recompute);
        }
        self.scroll.on_frame(&mut self.heights, viewport_height)
    }

    /// Window computed by the most recent frame.
    pub fn window(&self) -> WindowState {
        self.scroll.last_window().unwrap_or_default()
    }

    /// Visible rows inside `window`.
    pub fn window_rows(&mut self, window: WindowState) -> &[VisibleRow] {
        self.refresh_views();
        let tail = window.tail.min(self.views.rows.len());
        let head = window.head.min(tail);
        &self.views.rows[head..tail]
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroll.is_scrolling()
    }

    // ===== Export =====

    /// Writes the visible rows to an XLSX workbook.
    pub fn export_xlsx(&mut self, path: &Path) -> Result<()> {
        self.refresh_views();
        Exporter::new(&self.state, &self.views.layout, &self.views.rows, &self.registry)?.export_xlsx(path)
    }

    fn emit(&mut self, event: TableEvent) {
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;
    use crate::model::{NestedTable, Row, SortDirection, SorterInput};
    use crate::providers::{CancelToken, MemoryDataProvider};
    use crate::table::RowKind;
    use std::sync::Mutex;
    use std::time::Duration;
    use test_case::test_case;

    const WAIT: Duration = Duration::from_secs(5);

    fn columns() -> Vec<ColumnDef> {
        vec![ColumnDef::new("name", "Name").sortable(), ColumnDef::new("n", "N")]
    }

    fn rows(count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| Row::new(&format!("r{i}")).with("name", format!("row {i:05}")).with("n", i))
            .collect()
    }

    struct LazyChildren;

    impl ChildrenProvider for LazyChildren {
        fn children(&self, row: &Row, _cancel: &CancelToken) -> Result<Vec<Row>> {
            Ok(vec![Row::new(&format!("{}/0", row.key)), Row::new(&format!("{}/1", row.key))])
        }
    }

    struct FailingChildren;

    impl ChildrenProvider for FailingChildren {
        fn children(&self, _row: &Row, _cancel: &CancelToken) -> Result<Vec<Row>> {
            Err(TableError::Provider("backend down".into()))
        }
    }

    struct Nested;

    impl NestedTableProvider for Nested {
        fn nested_table(&self, row: &Row, _cancel: &CancelToken) -> Result<NestedTable> {
            Ok(NestedTable { columns: columns(), rows: vec![Row::new(&format!("{}-detail", row.key))] })
        }
    }

    #[derive(Default)]
    struct MemoryTemplates {
        saved: Mutex<Vec<Template>>,
    }

    impl TemplateProvider for MemoryTemplates {
        fn load(&self) -> Result<Vec<Template>> {
            Ok(self.saved.lock().map(|t| t.clone()).unwrap_or_default())
        }

        fn save(&self, templates: &[Template]) -> Result<()> {
            if let Ok(mut saved) = self.saved.lock() {
                *saved = templates.to_vec();
            }
            Ok(())
        }
    }

    #[test]
    fn test_end_to_end_window() {
        let mut controller = TableController::new(
            TableConfig { default_page_size: 10_000, ..TableConfig::default() },
            columns(),
        );
        controller.dispatch(TableAction::SetRows(rows(10_000)));

        let first = controller.frame(400.0).unwrap();
        assert_eq!(first.window, WindowState { head: 0, tail: 15, top_offset: 0.0 });

        controller.on_scroll(4000.0, 0.0);
        let second = controller.frame(400.0).unwrap();
        assert_eq!(second.window, WindowState { head: 95, tail: 115, top_offset: 3800.0 });
        assert_eq!(controller.window_rows(second.window).len(), 20);
        assert_eq!(controller.window_rows(second.window)[0].key, "r95");
    }

    #[test]
    fn test_async_fetch_and_change_events() {
        let provider = Arc::new(MemoryDataProvider::new(columns(), rows(50)));
        let config = TableConfig { mode: DataMode::Async, default_page_size: 10, ..TableConfig::default() };
        let mut controller = TableController::new(config, columns()).with_data_provider(provider);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        controller.on_event(move |event| {
            if let Ok(mut events) = sink.lock() {
                events.push(event.clone());
            }
        });

        controller.load(true);
        assert!(controller.state().is_loading());
        assert!(controller.wait_idle(WAIT));
        assert!(!controller.state().is_loading());
        assert_eq!(controller.state().pagination().total, 50);
        assert_eq!(controller.visible_rows().len(), 10);

        controller.dispatch(TableAction::Sort(vec![SorterInput::new("name", Some(SortDirection::Descend))]));
        controller.wait_idle(WAIT);
        assert_eq!(controller.visible_rows()[0].key, "r49");

        let events = events.lock().map(|e| e.clone()).unwrap_or_default();
        assert!(matches!(events.last(), Some(TableEvent::Change { action: ChangeKind::Sort, .. })));
    }

    #[test]
    fn test_lazy_children_loaded_on_expand() {
        let mut controller =
            TableController::new(TableConfig::default(), columns()).with_children_provider(Arc::new(LazyChildren));
        controller.dispatch(TableAction::SetRows(vec![Row::new("p").lazy(), Row::new("q")]));

        controller.expand_row(true, "p");
        let kinds: Vec<_> = controller.visible_rows().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RowKind::Data, RowKind::LoadingPlaceholder, RowKind::Data]);

        controller.wait_idle(WAIT);
        let keys: Vec<_> = controller.visible_rows().iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec!["p", "p/0", "p/1", "q"]);
    }

    #[test]
    fn test_failed_children_keep_rows_and_record_error() {
        let mut controller = TableController::new(TableConfig::default(), columns())
            .with_children_provider(Arc::new(FailingChildren));
        controller.dispatch(TableAction::SetRows(vec![Row::new("p").lazy()]));
        controller.expand_row(true, "p");
        controller.wait_idle(WAIT);

        assert_eq!(controller.last_error(), Some("provider failed: backend down"));
        assert!(!controller.state().rows().get("p").unwrap().is_loading());
        assert_eq!(controller.visible_rows().len(), 1);
    }

    #[test]
    fn test_nested_table_loaded_on_expand() {
        let mut controller =
            TableController::new(TableConfig::default(), columns()).with_nested_provider(Arc::new(Nested));
        controller.dispatch(TableAction::SetRows(vec![Row::new("p")]));
        controller.expand_row(true, "p");
        controller.wait_idle(WAIT);
        let row = &controller.visible_rows()[0];
        assert!(row.has_nested);
    }

    #[test]
    fn test_nested_table_not_fetched_for_inline_children() {
        let mut controller =
            TableController::new(TableConfig::default(), columns()).with_nested_provider(Arc::new(Nested));
        controller.dispatch(TableAction::SetRows(vec![Row::new("p").with_children(vec![Row::new("p/0")])]));
        controller.expand_row(true, "p");
        assert!(!controller.is_busy());
        assert!(!controller.state().rows().get("p").unwrap().is_loading());

        let visible = controller.visible_rows();
        let keys: Vec<_> = visible.iter().map(|r| (r.key.clone(), r.kind)).collect();
        assert_eq!(keys, vec![("p".to_string(), RowKind::Data), ("p/0".to_string(), RowKind::Data)]);
        assert!(!visible[0].has_nested);
    }

    #[test_case(false ; "without children provider")]
    #[test_case(true ; "with children provider")]
    fn test_large_inline_children_survive_collapse(with_provider: bool) {
        let mut controller = TableController::new(TableConfig::default(), columns());
        if with_provider {
            controller = controller.with_children_provider(Arc::new(LazyChildren));
        }
        let children: Vec<Row> = (0..301).map(|i| Row::new(&format!("p/{i}"))).collect();
        controller.dispatch(TableAction::SetRows(vec![Row::new("p").with_children(children)]));

        controller.expand_row(true, "p");
        assert_eq!(controller.visible_rows().len(), 302);
        controller.expand_row(false, "p");
        assert_eq!(controller.visible_rows().len(), 1);
        controller.expand_row(true, "p");
        assert!(controller.wait_idle(WAIT));

        let visible = controller.visible_rows();
        assert_eq!(visible.len(), 302);
        assert_eq!(visible[1].key, "p/0");
        assert_eq!(visible[301].key, "p/300");
    }

    #[test]
    fn test_fetched_children_refetched_after_eviction() {
        struct ManyChildren;

        impl ChildrenProvider for ManyChildren {
            fn children(&self, row: &Row, _cancel: &CancelToken) -> Result<Vec<Row>> {
                Ok((0..301).map(|i| Row::new(&format!("{}/{i}", row.key))).collect())
            }
        }

        let mut controller = TableController::new(TableConfig::default(), columns())
            .with_children_provider(Arc::new(ManyChildren));
        controller.dispatch(TableAction::SetRows(vec![Row::new("p").lazy()]));
        controller.expand_row(true, "p");
        assert!(controller.wait_idle(WAIT));
        assert_eq!(controller.visible_rows().len(), 302);

        controller.expand_row(false, "p");
        assert!(!controller.state().rows().contains("p/0"));
        controller.expand_row(true, "p");
        assert!(controller.wait_idle(WAIT));
        assert_eq!(controller.visible_rows().len(), 302);
    }

    #[test]
    fn test_favorite_template_applies_before_first_fetch() {
        let templates = Arc::new(MemoryTemplates::default());
        let provider = Arc::new(MemoryDataProvider::new(columns(), rows(30)));
        let config = TableConfig { mode: DataMode::Async, ..TableConfig::default() };

        // First session saves a favorite sorted by name, descending
        let mut first = TableController::new(config.clone(), columns())
            .with_template_provider(templates.clone());
        first.dispatch(TableAction::Sort(vec![SorterInput::new("name", Some(SortDirection::Descend))]));
        first.save_template("desc", true);

        // Second session picks it up before fetching
        let mut second = TableController::new(config, columns())
            .with_template_provider(templates)
            .with_data_provider(provider);
        second.load(false);
        second.wait_idle(WAIT);
        assert_eq!(second.state().sorters().direction_of("name"), Some(SortDirection::Descend));
        assert_eq!(second.visible_rows()[0].key, "r29");
    }

    #[test]
    fn test_expand_events_and_scroll_to_end() {
        let mut controller = TableController::new(TableConfig::default(), columns());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        controller.on_event(move |event| {
            if let (TableEvent::Expand { expanded, key }, Ok(mut seen)) = (event, sink.lock()) {
                seen.push((*expanded, key.clone()));
            }
        });
        controller.dispatch(TableAction::SetRows(vec![Row::new("a").with_children(vec![Row::new("a1")])]));
        controller.expand_row(true, "a");
        controller.expand_row(false, "a");
        let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(seen, vec![(true, "a".to_string()), (false, "a".to_string())]);

        controller.dispatch(TableAction::SetRows(rows(20)));
        controller.scroll_to(ScrollTarget::End);
        let mut settled = None;
        for _ in 0..5 {
            if let Some(outcome) = controller.frame(200.0) {
                if outcome.settled {
                    settled = Some(outcome);
                    break;
                }
            }
        }
        let outcome = settled.expect("programmatic scroll settles");
        assert_eq!(outcome.window.tail, 20);
        assert_eq!(outcome.scroll_top, 20.0 * 40.0 - 200.0);
    }
}

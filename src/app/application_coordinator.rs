//! Application-level workflows.
//!
//! Turns panel interactions into controller calls, and loaded datasets into
//! a configured `TableController`.

use crate::app::app_state::{EventLog, EVENT_LOG_LEN};
use crate::app::AppState;
use crate::io::{AsyncLoader, LoadResult};
use crate::ui::header::HeaderInteraction;
use crate::ui::panel_manager::PanelInteraction;
use crate::ui::status_bar::PagerInteraction;
use crate::ui::table_header::TableHeaderInteraction;
use crate::ui::table_panel::TablePanelInteraction;
use rvtable::{
    DataMode, Dataset, DemoChildrenProvider, DemoOptions, JsonTemplateStore, MemoryDataProvider,
    Pagination, TableAction, TableController, TableEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct ApplicationCoordinator;

impl ApplicationCoordinator {
    /// Starts loading a dataset file, dropping the current table.
    pub fn open_file(state: &mut AppState, loader: &mut AsyncLoader, path: PathBuf, ctx: &egui::Context) {
        state.reset_table_state();
        loader.start_file_load(path, ctx);
    }

    /// Starts generating a demo dataset.
    pub fn open_demo(state: &mut AppState, loader: &mut AsyncLoader, ctx: &egui::Context) {
        state.reset_table_state();
        loader.start_demo(DemoOptions::default(), ctx);
    }

    /// Installs a finished load. Called once per frame.
    ///
    /// # Returns
    /// `true` if a load completed (success or error).
    pub fn check_loading_completion(
        state: &mut AppState,
        loader: &mut AsyncLoader,
        ctx: &egui::Context,
    ) -> bool {
        match loader.check_completion() {
            LoadResult::Success { dataset, path } => {
                let generated = path.is_none();
                state.table = Some(Self::build_controller(state, dataset, generated, ctx));
                state.dataset_path = path;
                state.error_message = None;
                true
            }
            LoadResult::Error(message) => {
                log::error!("dataset load failed: {message}");
                state.error_message = Some(format!("Error loading dataset: {message}"));
                true
            }
            LoadResult::None => false,
        }
    }

    /// Creates the controller for a dataset, honoring the selected mode.
    ///
    /// Only generated datasets get the demo children provider; rows of a
    /// loaded file keep exactly the children the file declares.
    fn build_controller(
        state: &AppState,
        dataset: Dataset,
        generated: bool,
        ctx: &egui::Context,
    ) -> TableController {
        let mut config = dataset.config_or_default();
        config.mode = state.settings.mode;
        config.default_page_size = state.settings.page_size.max(1);
        let latency = Duration::from_millis(state.settings.latency_ms);

        let mut controller = TableController::new(config, dataset.columns.clone());
        if generated {
            controller = controller.with_children_provider(Arc::new(DemoChildrenProvider {
                latency,
                ..DemoChildrenProvider::default()
            }));
        }
        if let Some(store) = JsonTemplateStore::user_default() {
            controller = controller.with_template_provider(Arc::new(store));
        }
        if state.settings.mode == DataMode::Async {
            let provider = MemoryDataProvider::new(dataset.columns, dataset.rows).with_latency(latency);
            controller = controller.with_data_provider(Arc::new(provider));
        } else {
            controller.dispatch(TableAction::SetRows(dataset.rows));
        }

        let repaint = ctx.clone();
        controller.set_waker(Arc::new(move || repaint.request_repaint()));
        let events = Arc::clone(&state.events);
        controller.on_event(move |event| record_event(&events, event));
        controller.load(true);
        controller
    }

    /// Applies finished provider requests and surfaces their errors.
    pub fn poll_table(state: &mut AppState) {
        let Some(table) = state.table.as_mut() else {
            return;
        };
        if table.poll() {
            if let Some(error) = table.last_error() {
                state.error_message = Some(error.to_string());
            }
        }
    }

    // ===== Interaction Handling =====

    pub fn handle_interaction(
        state: &mut AppState,
        loader: &mut AsyncLoader,
        interaction: PanelInteraction,
        ctx: &egui::Context,
    ) {
        match interaction {
            PanelInteraction::Header(header) => Self::handle_header(state, loader, header, ctx),
            PanelInteraction::Table(table) => Self::handle_table(state, table),
            PanelInteraction::Pager(pager) => Self::handle_pager(state, pager),
        }
    }

    fn handle_header(
        state: &mut AppState,
        loader: &mut AsyncLoader,
        interaction: HeaderInteraction,
        ctx: &egui::Context,
    ) {
        match interaction {
            HeaderInteraction::OpenFileRequested(path) => Self::open_file(state, loader, path, ctx),
            HeaderInteraction::OpenDemoRequested => Self::open_demo(state, loader, ctx),
            HeaderInteraction::ExportRequested(path) => {
                let Some(table) = state.table.as_mut() else {
                    return;
                };
                match table.export_xlsx(&path) {
                    Ok(()) => state.status_message = Some(format!("Exported to {}", path.display())),
                    Err(e) => {
                        log::error!("export failed: {e}");
                        state.error_message = Some(format!("Export failed: {e}"));
                    }
                }
            }
            HeaderInteraction::SearchSubmitted(text) => {
                if let Some(table) = state.table.as_mut() {
                    table.dispatch(TableAction::Search(text));
                }
            }
            HeaderInteraction::ReloadRequested => {
                if let Some(table) = state.table.as_mut() {
                    state.error_message = None;
                    table.reload();
                }
            }
            HeaderInteraction::SaveTemplate { name, favorite } => {
                if let Some(table) = state.table.as_mut() {
                    let id = table.save_template(&name, favorite);
                    state.status_message = Some(format!("Saved template {name} ({id})"));
                }
            }
            HeaderInteraction::ApplyTemplate(id) => {
                if let Some(table) = state.table.as_mut() {
                    table.apply_template(&id);
                }
            }
            HeaderInteraction::DeleteTemplate(id) => {
                if let Some(table) = state.table.as_mut() {
                    table.delete_template(&id);
                }
            }
            HeaderInteraction::SetFavorite { id, favorite } => {
                if let Some(table) = state.table.as_mut() {
                    table.set_favorite_template(&id, favorite);
                }
            }
            HeaderInteraction::ColumnVisibility { key, visible } => {
                if let Some(table) = state.table.as_mut() {
                    table.dispatch(TableAction::ColumnVisibility { key, visible });
                }
            }
        }
    }

    fn handle_table(state: &mut AppState, interaction: TablePanelInteraction) {
        let Some(table) = state.table.as_mut() else {
            return;
        };
        match interaction {
            TablePanelInteraction::ExpandToggled { key, was_expanded } => {
                table.expand_row(!was_expanded, &key);
            }
            TablePanelInteraction::Header(TableHeaderInteraction::SortClicked(key)) => {
                let sorters = table.state().sorters_after_click(&key);
                table.dispatch(TableAction::Sort(sorters));
            }
            TablePanelInteraction::Header(TableHeaderInteraction::Resized { key, width }) => {
                table.dispatch(TableAction::ColumnWidthChange { key, width });
            }
            TablePanelInteraction::Header(TableHeaderInteraction::Hide(key)) => {
                table.dispatch(TableAction::ColumnVisibility { key, visible: false });
            }
            TablePanelInteraction::Header(TableHeaderInteraction::Move { from, to }) => {
                table.dispatch(TableAction::MoveColumn { from, to });
            }
        }
    }

    fn handle_pager(state: &mut AppState, interaction: PagerInteraction) {
        let Some(table) = state.table.as_mut() else {
            return;
        };
        match interaction {
            PagerInteraction::Page(current) => {
                let pagination = Pagination { current, ..table.state().pagination() };
                table.dispatch(TableAction::Paginate(pagination));
            }
            PagerInteraction::PageSize(size) => {
                state.settings.page_size = size;
                table.reset_pagination(Some(size));
            }
            PagerInteraction::ScrollTo(target) => table.scroll_to(target),
        }
    }
}

/// Appends a change event to the bounded log.
fn record_event(events: &EventLog, event: &TableEvent) {
    let line = match event {
        TableEvent::Change { pagination, sorters, filters, action } => format!(
            "{:?}: page {}/{} | {} sorter(s) | {} filter(s)",
            action,
            pagination.current,
            pagination.page_count().max(1),
            sorters.entries().len(),
            filters.len()
        ),
        TableEvent::Expand { expanded, key } => {
            format!("{} {}", if *expanded { "Expanded" } else { "Collapsed" }, key)
        }
    };
    if let Ok(mut events) = events.lock() {
        events.push(line);
        let overflow = events.len().saturating_sub(EVENT_LOG_LEN);
        events.drain(..overflow);
    }
}

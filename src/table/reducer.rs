//! Table state transitions.
//!
//! `reduce` never mutates its input: it clones the (cheap, `Arc`-backed)
//! state, replaces the fields the action touches and returns the result.
//! Actions addressing unknown rows, columns or templates leave the state
//! unchanged.

use crate::model::{
    collect_leaves, enforce_single_favorite, ColumnDef, ColumnKey, FilterSpec, NestedTable,
    Pagination, Row, RowKey, RowStore, SortConfig, SortEntry, SortSpec, SorterInput, Template,
    TemplateColumn,
};
use crate::table::columns::{move_column, reindex_order, reindex_tree};
use crate::table::state::{build_field_index, TableState};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// A state transition request.
#[derive(Debug, Clone)]
pub enum TableAction {
    /// Replace the column definitions
    UpdateColumns(Vec<ColumnDef>),
    ColumnWidthChange { key: ColumnKey, width: f32 },
    ColumnVisibility { key: ColumnKey, visible: bool },
    /// Drag-reorder: move `from` onto the position of `to`
    MoveColumn { from: ColumnKey, to: ColumnKey },
    Sort(Vec<SorterInput>),
    /// UI column key → selected values
    Filter(BTreeMap<ColumnKey, Vec<Value>>),
    Search(String),
    Paginate(Pagination),
    ResetPagination { page_size: Option<usize> },
    SetRows(Vec<Row>),
    SetTotal(usize),
    SetLoading(bool),
    ExpandRow(RowKey),
    CollapseRow(RowKey),
    /// Mark a row as waiting for its children
    AddLoadingRow(RowKey),
    /// Drop the loading mark after a failed child request
    ClearLoadingRow(RowKey),
    SetRowChildren { key: RowKey, rows: Vec<Row> },
    SetNestedTable { key: RowKey, table: NestedTable },
    UpdateRow { key: RowKey, patch: Map<String, Value> },
    SetTemplates(Vec<Template>),
    /// Snapshot the current view under `id` (replacing a template with that id)
    SaveTemplate { id: String, name: String, favorite: bool },
    DeleteTemplate(String),
    SetFavoriteTemplate { id: String, favorite: bool },
    ApplyTemplate(String),
}

impl TableAction {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TableAction::UpdateColumns(_) => "update_columns",
            TableAction::ColumnWidthChange { .. } => "column_width_change",
            TableAction::ColumnVisibility { .. } => "column_visibility",
            TableAction::MoveColumn { .. } => "move_column",
            TableAction::Sort(_) => "sort",
            TableAction::Filter(_) => "filter",
            TableAction::Search(_) => "search",
            TableAction::Paginate(_) => "paginate",
            TableAction::ResetPagination { .. } => "reset_pagination",
            TableAction::SetRows(_) => "set_rows",
            TableAction::SetTotal(_) => "set_total",
            TableAction::SetLoading(_) => "set_loading",
            TableAction::ExpandRow(_) => "expand_row",
            TableAction::CollapseRow(_) => "collapse_row",
            TableAction::AddLoadingRow(_) => "add_loading_row",
            TableAction::ClearLoadingRow(_) => "clear_loading_row",
            TableAction::SetRowChildren { .. } => "set_row_children",
            TableAction::SetNestedTable { .. } => "set_nested_table",
            TableAction::UpdateRow { .. } => "update_row",
            TableAction::SetTemplates(_) => "set_templates",
            TableAction::SaveTemplate { .. } => "save_template",
            TableAction::DeleteTemplate(_) => "delete_template",
            TableAction::SetFavoriteTemplate { .. } => "set_favorite_template",
            TableAction::ApplyTemplate(_) => "apply_template",
        }
    }
}

// ===== Column Ordering =====

/// Decides the order of incoming columns on a column update.
pub trait ColumnOrderStrategy {
    /// Orders `incoming` given the columns currently in the state.
    fn reorder(&self, previous: &[ColumnDef], incoming: Vec<ColumnDef>) -> Vec<ColumnDef>;
}

/// Keeps surviving columns (matched by field path) in their prior relative
/// order; new columns keep their incoming positions.
pub struct PreserveColumnOrder;

impl ColumnOrderStrategy for PreserveColumnOrder {
    fn reorder(&self, previous: &[ColumnDef], incoming: Vec<ColumnDef>) -> Vec<ColumnDef> {
        preserve_order(previous, incoming)
    }
}

fn preserve_order(previous: &[ColumnDef], incoming: Vec<ColumnDef>) -> Vec<ColumnDef> {
    let prior: HashMap<&str, (usize, &ColumnDef)> = previous
        .iter()
        .enumerate()
        .map(|(index, column)| (column.identity(), (index, column)))
        .collect();
    let mut ordered = slot_reorder(incoming, |column| prior.get(column.identity()).map(|(i, _)| *i));
    for column in ordered.iter_mut() {
        if column.children.is_empty() {
            continue;
        }
        if let Some((_, before)) = prior.get(column.identity()) {
            let children = std::mem::take(&mut column.children);
            column.children = preserve_order(&before.children, children);
        }
    }
    ordered
}

/// Reorders ranked columns among the positions ranked columns occupy.
/// Unranked columns stay where they are.
fn slot_reorder(
    columns: Vec<ColumnDef>,
    rank: impl Fn(&ColumnDef) -> Option<usize>,
) -> Vec<ColumnDef> {
    let mut slots = Vec::new();
    let mut ranked = Vec::new();
    let mut result: Vec<Option<ColumnDef>> = Vec::with_capacity(columns.len());
    for (index, column) in columns.into_iter().enumerate() {
        match rank(&column) {
            Some(r) => {
                slots.push(index);
                ranked.push((r, column));
                result.push(None);
            }
            None => result.push(Some(column)),
        }
    }
    // Stable, so equal ranks keep incoming order
    ranked.sort_by_key(|(r, _)| *r);
    for (slot, (_, column)) in slots.into_iter().zip(ranked) {
        result[slot] = Some(column);
    }
    result.into_iter().flatten().collect()
}

// ===== Reducer =====

/// Applies `action` with the default column order strategy.
pub fn reduce(state: &TableState, action: TableAction) -> TableState {
    reduce_with(state, action, &PreserveColumnOrder)
}

/// Applies `action`, using `strategy` for column updates.
///
/// # Returns
/// The next state. Its revision is bumped only when something changed.
pub fn reduce_with(
    state: &TableState,
    action: TableAction,
    strategy: &dyn ColumnOrderStrategy,
) -> TableState {
    log::debug!("reduce {} at revision {}", action.name(), state.revision);
    match action {
        TableAction::UpdateColumns(columns) => update_columns(state, columns, strategy),
        TableAction::ColumnWidthChange { key, width } => column_width_change(state, &key, width),
        TableAction::ColumnVisibility { key, visible } => column_visibility(state, &key, visible),
        TableAction::MoveColumn { from, to } => {
            let columns = move_column(&state.columns, &from, &to);
            let mut next = state.clone();
            next.columns = Arc::new(columns);
            changed(next)
        }
        TableAction::Sort(sorters) => {
            let mut next = state.clone();
            next.sorters = Arc::new(normalize_sorters(state, &sorters));
            changed(next)
        }
        TableAction::Filter(filters) => {
            let mut next = state.clone();
            next.filters = Arc::new(normalize_filters(state, filters));
            next.pagination.current = 1;
            changed(next)
        }
        TableAction::Search(term) => {
            let mut next = state.clone();
            next.search = Arc::from(term.as_str());
            next.pagination.current = 1;
            changed(next)
        }
        TableAction::Paginate(pagination) => {
            let mut next = state.clone();
            next.pagination = Pagination {
                total: state.pagination.total,
                ..pagination.normalized()
            };
            changed(next)
        }
        TableAction::ResetPagination { page_size } => {
            let mut next = state.clone();
            next.pagination.current = 1;
            if let Some(size) = page_size {
                next.pagination.page_size = size.max(1);
            }
            changed(next)
        }
        TableAction::SetRows(rows) => {
            let mut next = state.clone();
            let store = RowStore::from_rows(rows);
            next.expanded =
                Arc::new(state.expanded.iter().filter(|k| store.contains(k)).cloned().collect());
            next.rows = Arc::new(store);
            changed(next)
        }
        TableAction::SetTotal(total) => {
            let mut next = state.clone();
            next.pagination.total = total;
            changed(next)
        }
        TableAction::SetLoading(loading) => {
            if state.loading == loading {
                return state.clone();
            }
            let mut next = state.clone();
            next.loading = loading;
            changed(next)
        }
        TableAction::ExpandRow(key) => expand_row(state, key),
        TableAction::CollapseRow(key) => collapse_row(state, &key),
        TableAction::AddLoadingRow(key) => {
            let next = mutate_rows(state, &key, |rows| rows.set_loading(&key, true));
            if next.revision == state.revision || next.is_expanded(&key) {
                return next;
            }
            let mut next = next;
            Arc::make_mut(&mut next.expanded).insert(key);
            next
        }
        TableAction::ClearLoadingRow(key) => {
            mutate_rows(state, &key, |store| store.set_loading(&key, false))
        }
        TableAction::SetRowChildren { key, rows } => {
            let mut next = mutate_rows(state, &key, |store| store.set_children(&key, rows));
            prune_expanded(&mut next);
            next
        }
        TableAction::SetNestedTable { key, table } => {
            mutate_rows(state, &key, |store| store.set_nested(&key, table))
        }
        TableAction::UpdateRow { key, patch } => {
            mutate_rows(state, &key, |store| store.patch(&key, patch))
        }
        TableAction::SetTemplates(mut templates) => {
            enforce_single_favorite(&mut templates);
            let mut next = state.clone();
            if let Some(active) = &state.active_template {
                if !templates.iter().any(|t| &t.id == active) {
                    next.active_template = None;
                }
            }
            next.templates = Arc::new(templates);
            changed(next)
        }
        TableAction::SaveTemplate { id, name, favorite } => save_template(state, &id, &name, favorite),
        TableAction::DeleteTemplate(id) => {
            if !state.templates.iter().any(|t| t.id == id) {
                log::debug!("delete of unknown template {id:?} ignored");
                return state.clone();
            }
            let mut next = state.clone();
            Arc::make_mut(&mut next.templates).retain(|t| t.id != id);
            if next.active_template.as_deref() == Some(id.as_str()) {
                next.active_template = None;
            }
            changed(next)
        }
        TableAction::SetFavoriteTemplate { id, favorite } => {
            if !state.templates.iter().any(|t| t.id == id) {
                return state.clone();
            }
            let mut next = state.clone();
            for template in Arc::make_mut(&mut next.templates).iter_mut() {
                if template.id == id {
                    template.favorite = favorite;
                } else if favorite {
                    template.favorite = false;
                }
            }
            changed(next)
        }
        TableAction::ApplyTemplate(id) => match state.templates.iter().find(|t| t.id == id) {
            Some(template) => recovery_state(state, template),
            None => {
                log::debug!("apply of unknown template {id:?} ignored");
                state.clone()
            }
        },
    }
}

fn changed(mut next: TableState) -> TableState {
    next.revision += 1;
    next
}

/// Runs a row mutation on a copy of the arena. Unknown keys are no-ops.
fn mutate_rows(state: &TableState, key: &str, f: impl FnOnce(&mut RowStore) -> bool) -> TableState {
    if !state.rows.contains(key) {
        log::debug!("row {key:?} is not materialized, mutation ignored");
        return state.clone();
    }
    let mut next = state.clone();
    if f(Arc::make_mut(&mut next.rows)) {
        changed(next)
    } else {
        state.clone()
    }
}

/// Drops expanded keys whose rows left the arena.
fn prune_expanded(state: &mut TableState) {
    if state.expanded.iter().all(|k| state.rows.contains(k)) {
        return;
    }
    let rows = Arc::clone(&state.rows);
    Arc::make_mut(&mut state.expanded).retain(|k| rows.contains(k));
}

// ===== Columns =====

fn update_columns(
    state: &TableState,
    columns: Vec<ColumnDef>,
    strategy: &dyn ColumnOrderStrategy,
) -> TableState {
    let mut columns = if state.config.force_columns || state.columns.is_empty() {
        columns
    } else {
        strategy.reorder(&state.columns, columns)
    };
    reindex_tree(&mut columns);

    let mut keys = HashSet::new();
    collect_keys(&columns, &mut keys);
    let mut previous_keys = HashSet::new();
    collect_keys(&state.columns, &mut previous_keys);

    let field_index = build_field_index(&columns);
    let fields: HashSet<String> = field_index.values().cloned().collect();

    let mut sorters = (*state.sorters).clone();
    sorters.retain_fields(&fields);
    let filters: FilterSpec = state
        .filters
        .iter()
        .filter(|(field, _)| fields.contains(*field))
        .map(|(field, values)| (field.clone(), values.clone()))
        .collect();

    let widths: HashMap<ColumnKey, f32> = state
        .widths
        .iter()
        .filter(|(key, _)| keys.contains(*key))
        .map(|(key, width)| (key.clone(), *width))
        .collect();
    let mut hidden: HashSet<ColumnKey> =
        state.hidden.iter().filter(|k| keys.contains(*k)).cloned().collect();
    mark_new_hidden(&columns, &previous_keys, &mut hidden);

    let mut next = state.clone();
    next.columns = Arc::new(columns);
    next.field_index = Arc::new(field_index);
    next.sorters = Arc::new(sorters);
    next.filters = Arc::new(filters);
    next.widths = Arc::new(widths);
    next.hidden = Arc::new(hidden);
    changed(next)
}

fn collect_keys(columns: &[ColumnDef], out: &mut HashSet<ColumnKey>) {
    for column in columns {
        out.insert(column.key.clone());
        collect_keys(&column.children, out);
    }
}

/// Newly added columns flagged `hidden_by_default` start hidden.
fn mark_new_hidden(columns: &[ColumnDef], previous: &HashSet<ColumnKey>, hidden: &mut HashSet<ColumnKey>) {
    for column in columns {
        if column.hidden_by_default && !previous.contains(&column.key) {
            hidden.insert(column.key.clone());
        }
        mark_new_hidden(&column.children, previous, hidden);
    }
}

fn find_column<'a>(columns: &'a [ColumnDef], key: &str) -> Option<&'a ColumnDef> {
    for column in columns {
        if column.key == key {
            return Some(column);
        }
        if let Some(found) = find_column(&column.children, key) {
            return Some(found);
        }
    }
    None
}

fn column_width_change(state: &TableState, key: &str, width: f32) -> TableState {
    let Some(column) = find_column(&state.columns, key) else {
        return state.clone();
    };
    let width = width.max(column.min_width);
    if state.widths.get(key) == Some(&width) || !width.is_finite() {
        return state.clone();
    }
    let mut next = state.clone();
    Arc::make_mut(&mut next.widths).insert(key.to_string(), width);
    changed(next)
}

fn column_visibility(state: &TableState, key: &str, visible: bool) -> TableState {
    if find_column(&state.columns, key).is_none() || state.hidden.contains(key) != visible {
        return state.clone();
    }
    let mut next = state.clone();
    let hidden = Arc::make_mut(&mut next.hidden);
    if visible {
        hidden.remove(key);
    } else {
        hidden.insert(key.to_string());
    }
    changed(next)
}

// ===== Sort & Filter =====

/// Normalizes header sorter input into a field-path sort spec.
///
/// When the latest sorter belongs to a multi-sort column, every multi-sort
/// sorter is kept and ordered by priority, highest first. Otherwise only
/// the latest sorter survives.
fn normalize_sorters(state: &TableState, inputs: &[SorterInput]) -> SortSpec {
    let mut entries: Vec<(SortConfig, SortEntry)> = Vec::new();
    for input in inputs {
        let Some(direction) = input.direction else {
            continue;
        };
        let Some(field) = resolve_field(state, &input.column_key) else {
            log::debug!("sorter on unknown column {:?} dropped", input.column_key);
            continue;
        };
        let sort = state.column_for_field(&field).map(|c| c.sort).unwrap_or_default();
        // A later sorter on the same field replaces an earlier one
        entries.retain(|(_, e)| e.field != field);
        entries.push((sort, SortEntry { field, direction, priority: sort.priority() }));
    }

    let Some((latest, _)) = entries.last() else {
        return SortSpec::default();
    };
    if latest.priority().is_none() {
        return entries.pop().map(|(_, e)| SortSpec::new(vec![e])).unwrap_or_default();
    }
    let mut multiple: Vec<SortEntry> = entries
        .into_iter()
        .filter(|(sort, _)| sort.priority().is_some())
        .map(|(_, e)| e)
        .collect();
    multiple.sort_by(|a, b| b.priority.cmp(&a.priority));
    SortSpec::new(multiple)
}

/// UI key → field path; a bare field path is accepted too.
fn resolve_field(state: &TableState, key: &str) -> Option<String> {
    state
        .field_of(key)
        .map(str::to_string)
        .or_else(|| state.field_index.values().find(|f| f.as_str() == key).cloned())
}

fn normalize_filters(state: &TableState, filters: BTreeMap<ColumnKey, Vec<Value>>) -> FilterSpec {
    filters
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .filter_map(|(key, values)| match resolve_field(state, &key) {
            Some(field) => Some((field, values)),
            None => {
                log::debug!("filter on unknown column {key:?} dropped");
                None
            }
        })
        .collect()
}

// ===== Rows =====

fn expand_row(state: &TableState, key: RowKey) -> TableState {
    if !state.rows.contains(&key) || state.is_expanded(&key) {
        return state.clone();
    }
    let mut next = state.clone();
    Arc::make_mut(&mut next.expanded).insert(key);
    changed(next)
}

fn collapse_row(state: &TableState, key: &str) -> TableState {
    if !state.rows.contains(key) {
        return state.clone();
    }
    let mut next = state.clone();
    Arc::make_mut(&mut next.expanded).remove(key);

    let child_count = state.rows.children_of(key).map_or(0, |c| c.len());
    let refetchable = state.rows.get(key).is_some_and(|n| n.children_fetched());
    if refetchable && child_count > state.config.eviction_threshold {
        let evicted = Arc::make_mut(&mut next.rows).evict_children(key);
        log::debug!("collapse of {key:?} evicted {evicted} rows");
        prune_expanded(&mut next);
    }
    changed(next)
}

// ===== Templates =====

fn save_template(state: &TableState, id: &str, name: &str, favorite: bool) -> TableState {
    let template = state.snapshot_template(id, name, favorite);
    let mut next = state.clone();
    let templates = Arc::make_mut(&mut next.templates);
    if favorite {
        for other in templates.iter_mut() {
            other.favorite = false;
        }
    }
    match templates.iter_mut().find(|t| t.id == id) {
        Some(existing) => *existing = template,
        None => templates.push(template),
    }
    next.active_template = Some(id.to_string());
    changed(next)
}

/// Rebuilds the view configuration from a template against the live
/// column definitions.
///
/// Columns are matched by field path (key for groups). Saved columns that
/// no longer exist are dropped; live columns the template does not know
/// keep their current position, width and visibility.
pub fn recovery_state(state: &TableState, template: &Template) -> TableState {
    let saved: HashMap<&str, &TemplateColumn> =
        template.columns.iter().map(|c| (c.field.as_str(), c)).collect();

    let mut columns = apply_saved_order((*state.columns).clone(), &saved);
    apply_sort_priority(&mut columns, &template.sort_priority);

    let mut widths = HashMap::new();
    let mut hidden = HashSet::new();
    let mut matched = 0;
    restore_layout(&columns, state, &saved, &mut widths, &mut hidden, &mut matched);
    if matched < template.columns.len() {
        log::debug!(
            "template {:?}: {} saved columns no longer exist",
            template.id,
            template.columns.len() - matched
        );
    }

    let fields: HashSet<String> = collect_leaves(&columns).iter().map(|c| c.field.clone()).collect();
    let mut sorters = template.sorters.clone();
    sorters.retain_fields(&fields);
    let filters: FilterSpec = template
        .filters
        .iter()
        .filter(|(field, _)| fields.contains(*field))
        .map(|(field, values)| (field.clone(), values.clone()))
        .collect();

    let mut next = state.clone();
    next.field_index = Arc::new(build_field_index(&columns));
    next.columns = Arc::new(columns);
    next.widths = Arc::new(widths);
    next.hidden = Arc::new(hidden);
    next.sorters = Arc::new(sorters);
    next.filters = Arc::new(filters);
    next.pagination = Pagination {
        total: state.pagination.total,
        ..template.pagination.normalized()
    };
    next.active_template = Some(template.id.clone());
    changed(next)
}

fn apply_saved_order(columns: Vec<ColumnDef>, saved: &HashMap<&str, &TemplateColumn>) -> Vec<ColumnDef> {
    let mut ordered = slot_reorder(columns, |column| saved.get(column.identity()).map(|s| s.order));
    for column in ordered.iter_mut() {
        if !column.children.is_empty() {
            let children = std::mem::take(&mut column.children);
            column.children = apply_saved_order(children, saved);
        }
    }
    reindex_order(&mut ordered);
    ordered
}

fn apply_sort_priority(columns: &mut [ColumnDef], priorities: &BTreeMap<String, u32>) {
    for column in columns.iter_mut() {
        if let (SortConfig::Multiple { .. }, Some(priority)) = (column.sort, priorities.get(&column.field)) {
            column.sort = SortConfig::Multiple { priority: *priority };
        }
        apply_sort_priority(&mut column.children, priorities);
    }
}

fn restore_layout(
    columns: &[ColumnDef],
    state: &TableState,
    saved: &HashMap<&str, &TemplateColumn>,
    widths: &mut HashMap<ColumnKey, f32>,
    hidden: &mut HashSet<ColumnKey>,
    matched: &mut usize,
) {
    for column in columns {
        match saved.get(column.identity()) {
            Some(entry) => {
                *matched += 1;
                if let Some(width) = entry.width {
                    widths.insert(column.key.clone(), width);
                }
                if entry.hidden {
                    hidden.insert(column.key.clone());
                }
            }
            None => {
                if let Some(width) = state.widths.get(&column.key) {
                    widths.insert(column.key.clone(), *width);
                }
                if state.hidden.contains(&column.key) {
                    hidden.insert(column.key.clone());
                }
            }
        }
        restore_layout(&column.children, state, saved, widths, hidden, matched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::model::{FixedPosition, SortDirection};
    use serde_json::json;

    fn column_keys(state: &TableState) -> Vec<String> {
        state.columns().iter().map(|c| c.key.clone()).collect()
    }

    fn base_state() -> TableState {
        TableState::new(
            &TableConfig::default(),
            vec![
                ColumnDef::new("a", "A").sortable(),
                ColumnDef::new("b", "B").multi_sort(1),
                ColumnDef::new("c", "C").multi_sort(5),
                ColumnDef::new("d", "D"),
            ],
        )
    }

    #[test]
    fn test_every_transition_returns_new_state() {
        let state = base_state();
        let next = reduce(&state, TableAction::Search("x".to_string()));
        assert_eq!(state.search(), "");
        assert_eq!(next.search(), "x");
        assert!(next.revision() > state.revision());
    }

    #[test]
    fn test_update_columns_preserves_relative_order() {
        let state = base_state();
        let state = reduce(&state, TableAction::MoveColumn { from: "d".into(), to: "a".into() });
        assert_eq!(column_keys(&state), vec!["d", "a", "b", "c"]);

        // Drop "b", add "e" at the front: survivors keep d, a, c
        let incoming = vec![
            ColumnDef::new("e", "E"),
            ColumnDef::new("a", "A"),
            ColumnDef::new("c", "C"),
            ColumnDef::new("d", "D"),
        ];
        let next = reduce(&state, TableAction::UpdateColumns(incoming));
        assert_eq!(column_keys(&next), vec!["e", "d", "a", "c"]);
        let orders: Vec<_> = next.columns().iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_force_columns_takes_incoming_order() {
        let config = TableConfig { force_columns: true, ..TableConfig::default() };
        let state = TableState::new(&config, vec![ColumnDef::new("a", "A"), ColumnDef::new("b", "B")]);
        let state = reduce(&state, TableAction::MoveColumn { from: "b".into(), to: "a".into() });
        let next = reduce(
            &state,
            TableAction::UpdateColumns(vec![ColumnDef::new("a", "A"), ColumnDef::new("b", "B")]),
        );
        assert_eq!(column_keys(&next), vec!["a", "b"]);
    }

    #[test]
    fn test_update_columns_intersects_sort_and_filter() {
        let state = base_state();
        let state = reduce(&state, TableAction::Sort(vec![SorterInput::new("a", Some(SortDirection::Ascend))]));
        let mut filters = BTreeMap::new();
        filters.insert("d".to_string(), vec![json!("x")]);
        let state = reduce(&state, TableAction::Filter(filters));

        let next = reduce(&state, TableAction::UpdateColumns(vec![ColumnDef::new("d", "D")]));
        assert!(next.sorters().is_empty());
        assert_eq!(next.filters().get("d"), Some(&vec![json!("x")]));
    }

    #[test]
    fn test_group_children_keep_prior_order() {
        let config = TableConfig::default();
        let group = |children: Vec<ColumnDef>| ColumnDef::group("g", "G", children);
        let state = TableState::new(
            &config,
            vec![group(vec![ColumnDef::new("x", "X"), ColumnDef::new("y", "Y")])],
        );
        let state = reduce(&state, TableAction::MoveColumn { from: "y".into(), to: "x".into() });
        let next = reduce(
            &state,
            TableAction::UpdateColumns(vec![group(vec![
                ColumnDef::new("x", "X"),
                ColumnDef::new("y", "Y"),
                ColumnDef::new("z", "Z"),
            ])]),
        );
        let children: Vec<_> = next.columns()[0].children.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(children, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_custom_order_strategy() {
        struct Reverse;
        impl ColumnOrderStrategy for Reverse {
            fn reorder(&self, _previous: &[ColumnDef], mut incoming: Vec<ColumnDef>) -> Vec<ColumnDef> {
                incoming.reverse();
                incoming
            }
        }
        let state = base_state();
        let next = reduce_with(
            &state,
            TableAction::UpdateColumns(vec![ColumnDef::new("a", "A"), ColumnDef::new("b", "B")]),
            &Reverse,
        );
        assert_eq!(column_keys(&next), vec!["b", "a"]);
    }

    #[test]
    fn test_width_change_noop_when_unchanged() {
        let state = base_state();
        let once = reduce(&state, TableAction::ColumnWidthChange { key: "a".into(), width: 200.0 });
        let twice = reduce(&once, TableAction::ColumnWidthChange { key: "a".into(), width: 200.0 });
        assert_eq!(once.revision(), twice.revision());
        assert!(Arc::ptr_eq(&once.widths, &twice.widths));
        let unknown = reduce(&state, TableAction::ColumnWidthChange { key: "zz".into(), width: 1.0 });
        assert_eq!(unknown.revision(), state.revision());
    }

    #[test]
    fn test_multi_sort_orders_by_priority() {
        let state = base_state();
        let next = reduce(
            &state,
            TableAction::Sort(vec![
                SorterInput::new("b", Some(SortDirection::Ascend)),
                SorterInput::new("c", Some(SortDirection::Descend)),
            ]),
        );
        let fields: Vec<_> = next.sorters().entries().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["c", "b"]);
    }

    #[test]
    fn test_single_sorter_keeps_latest_only() {
        let state = base_state();
        let next = reduce(
            &state,
            TableAction::Sort(vec![
                SorterInput::new("b", Some(SortDirection::Ascend)),
                SorterInput::new("a", Some(SortDirection::Descend)),
            ]),
        );
        assert_eq!(next.sorters(), &SortSpec::single("a", SortDirection::Descend));
    }

    #[test]
    fn test_header_click_cycles_sort() {
        let state = base_state();
        let state = reduce(&state, TableAction::Sort(state.sorters_after_click("a")));
        assert_eq!(state.sorters().direction_of("a"), Some(SortDirection::Ascend));
        let state = reduce(&state, TableAction::Sort(state.sorters_after_click("a")));
        assert_eq!(state.sorters().direction_of("a"), Some(SortDirection::Descend));
        let state = reduce(&state, TableAction::Sort(state.sorters_after_click("a")));
        assert!(state.sorters().is_empty());
    }

    #[test]
    fn test_filter_drops_empty_and_resets_page() {
        let columns = vec![ColumnDef::new("user.age", "Age").with_key("age")];
        let state = TableState::new(&TableConfig::default(), columns);
        let state = reduce(&state, TableAction::Paginate(Pagination { current: 3, page_size: 10, total: 0 }));
        let mut filters = BTreeMap::new();
        filters.insert("age".to_string(), vec![json!(30)]);
        filters.insert("nope".to_string(), vec![json!(1)]);
        filters.insert("user.age".to_string(), Vec::new());
        let next = reduce(&state, TableAction::Filter(filters));
        assert_eq!(next.filters().len(), 1);
        assert_eq!(next.filters().get("user.age"), Some(&vec![json!(30)]));
        assert_eq!(next.pagination().current, 1);
    }

    #[test]
    fn test_search_resets_page_and_paginate_floors_current() {
        let state = base_state();
        let state = reduce(&state, TableAction::Paginate(Pagination { current: 0, page_size: 5, total: 99 }));
        assert_eq!(state.pagination().current, 1);
        let state = reduce(&state, TableAction::Paginate(Pagination { current: 4, page_size: 5, total: 0 }));
        assert_eq!(state.pagination().current, 4);
        let state = reduce(&state, TableAction::Search("abc".into()));
        assert_eq!(state.pagination().current, 1);
        assert_eq!(state.pagination().page_size, 5);
    }

    #[test]
    fn test_collapse_evicts_large_child_sets() {
        let children: Vec<Row> = (0..301).map(|i| Row::new(&format!("p/{i}"))).collect();
        let rows = vec![
            Row::new("p").lazy(),
            Row::new("q").with_children(vec![Row::new("q/0")]),
        ];
        let state = reduce(&base_state(), TableAction::SetRows(rows));
        let state = reduce(&state, TableAction::SetRowChildren { key: "p".into(), rows: children });
        let state = reduce(&state, TableAction::ExpandRow("p".into()));
        let state = reduce(&state, TableAction::ExpandRow("q".into()));

        let next = reduce(&state, TableAction::CollapseRow("p".into()));
        assert_eq!(next.rows().children_of("p"), Some(&[][..]));
        assert!(!next.rows().contains("p/0"));
        assert!(next.rows().get("p").unwrap().needs_children());
        // Siblings untouched
        assert!(Arc::ptr_eq(state.rows().node_arc("q").unwrap(), next.rows().node_arc("q").unwrap()));
        assert!(next.is_expanded("q"));
        assert_eq!(next.rows().children_of("q").map(|c| c.len()), Some(1));
        // Mutations on evicted rows are no-ops
        let after = reduce(&next, TableAction::UpdateRow { key: "p/3".into(), patch: Map::new() });
        assert_eq!(after.revision(), next.revision());
    }

    #[test]
    fn test_collapse_keeps_large_inline_child_sets() {
        let children: Vec<Row> = (0..301).map(|i| Row::new(&format!("p/{i}"))).collect();
        let state = reduce(&base_state(), TableAction::SetRows(vec![Row::new("p").with_children(children)]));
        let state = reduce(&state, TableAction::ExpandRow("p".into()));

        let next = reduce(&state, TableAction::CollapseRow("p".into()));
        assert!(!next.is_expanded("p"));
        assert_eq!(next.rows().children_of("p").map(|c| c.len()), Some(301));
        assert!(next.rows().contains("p/300"));
        assert!(!next.rows().get("p").unwrap().needs_children());
    }

    #[test]
    fn test_collapse_below_threshold_keeps_children() {
        let rows = vec![Row::new("p").with_children((0..300).map(|i| Row::new(&format!("c{i}"))).collect())];
        let state = reduce(&base_state(), TableAction::SetRows(rows));
        let state = reduce(&state, TableAction::ExpandRow("p".into()));
        let next = reduce(&state, TableAction::CollapseRow("p".into()));
        assert_eq!(next.rows().children_of("p").map(|c| c.len()), Some(300));
        assert!(!next.is_expanded("p"));
    }

    #[test]
    fn test_row_mutations_locate_nested_rows() {
        let rows = vec![Row::new("a").with_children(vec![Row::new("a1").lazy()])];
        let state = reduce(&base_state(), TableAction::SetRows(rows));
        let state = reduce(&state, TableAction::AddLoadingRow("a1".into()));
        assert!(state.rows().get("a1").unwrap().is_loading());
        assert!(state.is_expanded("a1"));

        let state = reduce(
            &state,
            TableAction::SetRowChildren { key: "a1".into(), rows: vec![Row::new("a1x").with("v", 1)] },
        );
        assert!(!state.rows().get("a1").unwrap().is_loading());
        assert_eq!(state.rows().ancestors("a1x"), vec!["a".to_string(), "a1".to_string()]);

        let mut patch = Map::new();
        patch.insert("v".into(), json!(2));
        let next = reduce(&state, TableAction::UpdateRow { key: "a1x".into(), patch });
        assert_eq!(next.rows().get("a1x").unwrap().value("v"), Some(&json!(2)));
        assert!(Arc::ptr_eq(state.rows().node_arc("a").unwrap(), next.rows().node_arc("a").unwrap()));

        let nested = NestedTable { columns: vec![ColumnDef::new("n", "N")], rows: vec![Row::new("n1")] };
        let next = reduce(&next, TableAction::SetNestedTable { key: "a".into(), table: nested });
        assert_eq!(next.rows().get("a").unwrap().nested().map(|t| t.rows.len()), Some(1));
    }

    #[test]
    fn test_unknown_row_actions_are_noops() {
        let state = base_state();
        for action in [
            TableAction::ExpandRow("ghost".into()),
            TableAction::CollapseRow("ghost".into()),
            TableAction::AddLoadingRow("ghost".into()),
            TableAction::SetRowChildren { key: "ghost".into(), rows: Vec::new() },
        ] {
            assert_eq!(reduce(&state, action).revision(), state.revision());
        }
    }

    #[test]
    fn test_templates_single_favorite() {
        let state = base_state();
        let state = reduce(&state, TableAction::SaveTemplate { id: "t1".into(), name: "one".into(), favorite: true });
        let state = reduce(&state, TableAction::SaveTemplate { id: "t2".into(), name: "two".into(), favorite: true });
        let favorites: Vec<_> = state.templates().iter().filter(|t| t.favorite).map(|t| t.id.as_str()).collect();
        assert_eq!(favorites, vec!["t2"]);

        let state = reduce(&state, TableAction::SetFavoriteTemplate { id: "t1".into(), favorite: true });
        assert_eq!(state.favorite_template().map(|t| t.id.as_str()), Some("t1"));

        let state = reduce(&state, TableAction::DeleteTemplate("t2".into()));
        assert_eq!(state.templates().len(), 1);
        assert_eq!(state.active_template(), None);
    }

    #[test]
    fn test_apply_template_restores_view() {
        let state = base_state();
        let state = reduce(&state, TableAction::MoveColumn { from: "d".into(), to: "a".into() });
        let state = reduce(&state, TableAction::ColumnWidthChange { key: "b".into(), width: 222.0 });
        let state = reduce(&state, TableAction::ColumnVisibility { key: "c".into(), visible: false });
        let state = reduce(&state, TableAction::Sort(vec![SorterInput::new("a", Some(SortDirection::Descend))]));
        let state = reduce(&state, TableAction::Paginate(Pagination { current: 2, page_size: 50, total: 0 }));
        let saved = reduce(&state, TableAction::SaveTemplate { id: "t".into(), name: "t".into(), favorite: false });
        let template = saved.templates()[0].clone();

        let fresh = reduce(&base_state(), TableAction::SetTemplates(vec![template]));
        let restored = reduce(&fresh, TableAction::ApplyTemplate("t".into()));
        assert_eq!(column_keys(&restored), vec!["d", "a", "b", "c"]);
        assert_eq!(restored.widths().get("b"), Some(&222.0));
        assert!(restored.is_hidden("c"));
        assert_eq!(restored.sorters(), state.sorters());
        assert_eq!(restored.pagination().current, 2);
        assert_eq!(restored.pagination().page_size, 50);
        assert_eq!(restored.active_template(), Some("t"));
    }

    #[test]
    fn test_recovery_survives_schema_drift() {
        let state = base_state();
        let state = reduce(&state, TableAction::MoveColumn { from: "c".into(), to: "a".into() });
        let template = state.snapshot_template("t", "t", false);

        // "a" was removed and "new" added at the front
        let drifted = TableState::new(
            &TableConfig::default(),
            vec![
                ColumnDef::new("new", "New").fixed(FixedPosition::Left),
                ColumnDef::new("b", "B"),
                ColumnDef::new("c", "C"),
                ColumnDef::new("d", "D"),
            ],
        );
        let restored = recovery_state(&drifted, &template);
        assert_eq!(column_keys(&restored), vec!["new", "c", "b", "d"]);
    }

    #[test]
    fn test_template_sort_priority_reapplied() {
        let state = base_state();
        let mut template = state.snapshot_template("t", "t", false);
        template.sort_priority.insert("b".to_string(), 9);
        let restored = recovery_state(&state, &template);
        let b = restored.columns().iter().find(|c| c.key == "b").unwrap();
        assert_eq!(b.sort, SortConfig::Multiple { priority: 9 });
    }
}

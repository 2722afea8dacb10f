//! Local data projection: search → filter → sort → page.
//!
//! Only used in synchronous mode. In asynchronous mode the provider owns
//! search, filtering, sorting and paging, so the projection just mirrors
//! the rows it returned.

use crate::config::DataMode;
use crate::field_types::{FieldKind, FieldTypeRegistry};
use crate::model::{collect_leaves, ColumnDef, ColumnKey, RowKey, RowNode, RowStore, SortDirection};
use crate::table::state::TableState;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Rows to display, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Root rows of the current page
    pub roots: Vec<RowKey>,
    /// Projected child order for rows whose children are known
    pub children: HashMap<RowKey, Vec<RowKey>>,
    /// Ancestors of search matches, shown expanded regardless of state
    pub force_expanded: HashSet<RowKey>,
    /// Root rows matching search and filter, before paging
    pub total: usize,
}

impl Projection {
    pub fn children_of(&self, key: &str) -> &[RowKey] {
        self.children.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Working tree of keys while stages run.
#[derive(Debug, Clone)]
struct KeyNode {
    key: RowKey,
    /// None when the row's children are not materialized
    children: Option<Vec<KeyNode>>,
}

/// Projects the state's rows for display.
///
/// # Arguments
/// * `state` - Current table state
/// * `registry` - Field types driving search, filter and sort
///
/// # Returns
/// The projected rows of the current page and the ancestors to force-expand.
pub fn project(state: &TableState, registry: &FieldTypeRegistry) -> Projection {
    let store = state.rows();
    let tree = build_tree(store, store.roots());

    if state.config().mode == DataMode::Async {
        let mut projection = Projection {
            roots: tree.iter().map(|n| n.key.clone()).collect(),
            total: state.pagination().total.max(tree.len()),
            ..Projection::default()
        };
        index_children(&tree, &mut projection.children);
        return projection;
    }

    let kinds = field_kinds(state.columns());
    let mut force_expanded = HashSet::new();

    // Stage order matters: a parent kept by search may still be removed by
    // a filter, never the other way round
    let needle = state.search().trim().to_lowercase();
    let tree = if needle.is_empty() {
        tree
    } else {
        let fields = searchable_fields(state);
        let matches = |node: &RowNode| {
            fields.iter().any(|field| {
                let kind = kinds.get(field.as_str()).copied().unwrap_or_default();
                node.value(field)
                    .is_some_and(|value| registry.get(kind).matches_search(value, &needle))
            })
        };
        search_level(tree, store, &matches, &mut force_expanded)
    };

    let tree = if state.filters().is_empty() {
        tree
    } else {
        let matches = |node: &RowNode| {
            state.filters().iter().all(|(field, selected)| {
                let kind = kinds.get(field.as_str()).copied().unwrap_or_default();
                let field_type = registry.get(kind);
                let value = node.value(field).unwrap_or(&Value::Null);
                selected.iter().any(|s| field_type.matches_filter(value, s))
            })
        };
        filter_level(tree, store, &matches)
    };

    let mut tree = tree;
    if !state.sorters().is_empty() {
        let keys: Vec<(&str, FieldKind, SortDirection)> = state
            .sorters()
            .entries()
            .iter()
            .map(|e| {
                let kind = kinds.get(e.field.as_str()).copied().unwrap_or_default();
                (e.field.as_str(), kind, e.direction)
            })
            .collect();
        sort_level(&mut tree, store, &|a: &RowNode, b: &RowNode| {
            compare_rows(a, b, &keys, registry)
        });
    }

    let total = tree.len();
    let range = state.pagination().page_range(total);
    let page: Vec<KeyNode> = tree.into_iter().skip(range.start).take(range.len()).collect();

    let mut children = HashMap::new();
    index_children(&page, &mut children);
    Projection {
        roots: page.into_iter().map(|n| n.key).collect(),
        children,
        force_expanded,
        total,
    }
}

fn build_tree(store: &RowStore, keys: &[RowKey]) -> Vec<KeyNode> {
    keys.iter()
        .filter(|key| store.contains(key))
        .map(|key| KeyNode {
            key: key.clone(),
            children: store.children_of(key).map(|children| build_tree(store, children)),
        })
        .collect()
}

fn index_children(nodes: &[KeyNode], out: &mut HashMap<RowKey, Vec<RowKey>>) {
    for node in nodes {
        if let Some(children) = &node.children {
            out.insert(node.key.clone(), children.iter().map(|c| c.key.clone()).collect());
            index_children(children, out);
        }
    }
}

/// Field path → field kind for every leaf.
fn field_kinds(columns: &[ColumnDef]) -> HashMap<&str, FieldKind> {
    collect_leaves(columns)
        .into_iter()
        .map(|leaf| (leaf.field.as_str(), leaf.field_type))
        .collect()
}

/// Fields considered by search: visible leaves plus always-searchable ones.
fn searchable_fields(state: &TableState) -> Vec<String> {
    fn walk(columns: &[ColumnDef], hidden: &HashSet<ColumnKey>, all: bool, parent_hidden: bool, out: &mut Vec<String>) {
        for column in columns {
            let is_hidden = parent_hidden || hidden.contains(&column.key);
            if column.is_leaf() {
                if !column.field.is_empty() && (all || !is_hidden || column.always_searchable) {
                    out.push(column.field.clone());
                }
            } else {
                walk(&column.children, hidden, all, is_hidden, out);
            }
        }
    }
    let mut fields = Vec::new();
    walk(state.columns(), state.hidden(), state.config().search_hidden_fields, false, &mut fields);
    fields
}

// ===== Stages =====

/// Keeps matching rows with their whole subtree, and non-matching rows
/// that lead to a match. The latter are force-expanded.
fn search_level(
    nodes: Vec<KeyNode>,
    store: &RowStore,
    matches: &dyn Fn(&RowNode) -> bool,
    force_expanded: &mut HashSet<RowKey>,
) -> Vec<KeyNode> {
    let mut kept = Vec::new();
    for node in nodes {
        let Some(row) = store.get(&node.key) else {
            continue;
        };
        if matches(row) {
            kept.push(node);
            continue;
        }
        let Some(children) = node.children else {
            continue;
        };
        let children = search_level(children, store, matches, force_expanded);
        if !children.is_empty() {
            force_expanded.insert(node.key.clone());
            kept.push(KeyNode { key: node.key, children: Some(children) });
        }
    }
    kept
}

/// Filters every level; a non-matching row survives only through a
/// matching descendant.
fn filter_level(nodes: Vec<KeyNode>, store: &RowStore, matches: &dyn Fn(&RowNode) -> bool) -> Vec<KeyNode> {
    let mut kept = Vec::new();
    for node in nodes {
        let Some(row) = store.get(&node.key) else {
            continue;
        };
        let children = node.children.map(|c| filter_level(c, store, matches));
        let has_kept_children = children.as_ref().is_some_and(|c| !c.is_empty());
        if matches(row) || has_kept_children {
            kept.push(KeyNode { key: node.key, children });
        }
    }
    kept
}

/// Stable sort of every level independently.
fn sort_level(nodes: &mut [KeyNode], store: &RowStore, compare: &dyn Fn(&RowNode, &RowNode) -> Ordering) {
    nodes.sort_by(|a, b| match (store.get(&a.key), store.get(&b.key)) {
        (Some(a), Some(b)) => compare(a, b),
        _ => Ordering::Equal,
    });
    for node in nodes.iter_mut() {
        if let Some(children) = node.children.as_mut() {
            sort_level(children, store, compare);
        }
    }
}

fn compare_rows(
    a: &RowNode,
    b: &RowNode,
    keys: &[(&str, FieldKind, SortDirection)],
    registry: &FieldTypeRegistry,
) -> Ordering {
    for (field, kind, direction) in keys {
        let left = a.value(field).unwrap_or(&Value::Null);
        let right = b.value(field).unwrap_or(&Value::Null);
        let ordering = registry.get(*kind).compare(left, right);
        let ordering = match direction {
            SortDirection::Ascend => ordering,
            SortDirection::Descend => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

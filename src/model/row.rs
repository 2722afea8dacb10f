//! Rows and the keyed row arena.
//!
//! Rows arrive as an owned tree (`Row`) and are stored flat in a
//! `RowStore`: every node lives behind an `Arc` keyed by its row key, and
//! an explicit child → parent map replaces recursive tree walks. A mutation
//! touches only the addressed node, so snapshots of the store share every
//! untouched node.

use crate::model::ColumnDef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Type alias for row keys (stable identifiers supplied by the data source)
pub type RowKey = String;

/// A row as supplied by a data source or provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub key: RowKey,
    /// Field path → value
    #[serde(default)]
    pub values: Map<String, Value>,
    /// Inline tree children, if already known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Row>>,
    /// Children or a nested table are fetched on first expansion
    #[serde(default, skip_serializing_if = "is_false")]
    pub lazy: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Row {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            values: Map::new(),
            children: None,
            lazy: false,
        }
    }

    /// Builder-style value setter.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Row>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Looks up a value by field path.
    pub fn value(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.values, path)
    }
}

/// Resolves a field path against a value map.
///
/// An exact key match wins; otherwise the path is split on `.` and walked
/// through nested objects and arrays.
pub(crate) fn lookup_path<'a>(values: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = values.get(path) {
        return Some(value);
    }
    let mut parts = path.split('.');
    let mut current = values.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// A lazily loaded table rendered beneath an expanded row.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NestedTable {
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// A row stored in the arena.
#[derive(Debug, Clone)]
pub struct RowNode {
    key: RowKey,
    values: Map<String, Value>,
    /// None = children unknown, Some(empty) = known leaf or evicted
    children: Option<Vec<RowKey>>,
    nested: Option<Arc<NestedTable>>,
    lazy: bool,
    loading: bool,
    /// Children were delivered by a children provider, so they can be
    /// fetched again after eviction
    fetched: bool,
}

impl RowNode {
    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.values, path)
    }

    pub fn children(&self) -> Option<&[RowKey]> {
        self.children.as_deref()
    }

    pub fn nested(&self) -> Option<&NestedTable> {
        self.nested.as_deref()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the current children came from a provider.
    pub fn children_fetched(&self) -> bool {
        self.fetched
    }

    /// Whether an expand control should be offered for this row.
    pub fn is_expandable(&self) -> bool {
        match &self.children {
            Some(children) => !children.is_empty() || self.lazy,
            None => self.lazy,
        }
    }

    /// Whether expanding must fetch children first. Evicted rows qualify
    /// again because eviction leaves them lazy with no children.
    pub fn needs_children(&self) -> bool {
        let missing = self.children.as_ref().map_or(true, |children| children.is_empty());
        self.lazy && missing && !self.loading
    }

    /// Returns the row without its children, as handed to providers.
    pub fn to_row(&self) -> Row {
        Row {
            key: self.key.clone(),
            values: self.values.clone(),
            children: None,
            lazy: self.lazy,
        }
    }
}

/// Keyed row arena with an explicit parent index.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    nodes: HashMap<RowKey, Arc<RowNode>>,
    roots: Vec<RowKey>,
    parents: HashMap<RowKey, RowKey>,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the arena from an owned row tree.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut store = Self::new();
        for row in rows {
            if let Some(key) = store.insert_subtree(row, None) {
                store.roots.push(key);
            }
        }
        store
    }

    /// Inserts a row and its inline children. Returns the key when inserted.
    ///
    /// Keys must be unique across the whole arena; a duplicate is dropped
    /// together with its subtree.
    fn insert_subtree(&mut self, row: Row, parent: Option<&RowKey>) -> Option<RowKey> {
        if self.nodes.contains_key(&row.key) {
            log::debug!("duplicate row key {:?} ignored", row.key);
            return None;
        }
        let key = row.key;
        let child_keys = row.children.map(|children| {
            children
                .into_iter()
                .filter_map(|child| self.insert_subtree(child, Some(&key)))
                .collect::<Vec<_>>()
        });
        if let Some(parent) = parent {
            self.parents.insert(key.clone(), parent.clone());
        }
        self.nodes.insert(
            key.clone(),
            Arc::new(RowNode {
                key: key.clone(),
                values: row.values,
                children: child_keys,
                nested: None,
                lazy: row.lazy,
                loading: false,
                fetched: false,
            }),
        );
        Some(key)
    }

    // ===== Queries =====

    /// Number of rows currently materialized (all depths).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[RowKey] {
        &self.roots
    }

    pub fn get(&self, key: &str) -> Option<&RowNode> {
        self.nodes.get(key).map(|node| node.as_ref())
    }

    /// Shared handle to a node, for identity checks across snapshots.
    pub fn node_arc(&self, key: &str) -> Option<&Arc<RowNode>> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn parent_of(&self, key: &str) -> Option<&RowKey> {
        self.parents.get(key)
    }

    pub fn children_of(&self, key: &str) -> Option<&[RowKey]> {
        self.get(key).and_then(|node| node.children())
    }

    /// Ancestor keys of a row, root first.
    pub fn ancestors(&self, key: &str) -> Vec<RowKey> {
        let mut chain = Vec::new();
        let mut current = self.parents.get(key);
        while let Some(parent) = current {
            chain.push(parent.clone());
            current = self.parents.get(parent);
        }
        chain.reverse();
        chain
    }

    pub fn depth_of(&self, key: &str) -> usize {
        self.ancestors(key).len()
    }

    // ===== Mutations =====
    // Each mutation resolves the node through the arena and clones only
    // that node when it is shared with another snapshot.

    fn node_mut(&mut self, key: &str) -> Option<&mut RowNode> {
        self.nodes.get_mut(key).map(Arc::make_mut)
    }

    /// Replaces a row's children and indexes their parent pointers.
    ///
    /// # Returns
    /// `false` when the row is not in the arena (e.g. evicted).
    pub fn set_children(&mut self, key: &str, rows: Vec<Row>) -> bool {
        if !self.contains(key) {
            return false;
        }
        self.remove_descendants(key);
        let parent = key.to_string();
        let child_keys: Vec<RowKey> = rows
            .into_iter()
            .filter_map(|row| self.insert_subtree(row, Some(&parent)))
            .collect();
        match self.node_mut(key) {
            Some(node) => {
                node.children = Some(child_keys);
                node.lazy = false;
                node.loading = false;
                node.fetched = true;
                true
            }
            None => false,
        }
    }

    /// Drops a row's materialized descendants, leaving it re-expandable.
    ///
    /// Only provider-delivered children are evicted; inline children have
    /// no source to come back from and stay in the arena.
    ///
    /// # Returns
    /// Number of evicted rows.
    pub fn evict_children(&mut self, key: &str) -> usize {
        if !self.get(key).is_some_and(RowNode::children_fetched) {
            return 0;
        }
        let evicted = self.remove_descendants(key);
        if let Some(node) = self.node_mut(key) {
            node.children = Some(Vec::new());
            node.lazy = true;
            node.fetched = false;
        }
        evicted
    }

    fn remove_descendants(&mut self, key: &str) -> usize {
        let Some(children) = self.children_of(key).map(|c| c.to_vec()) else {
            return 0;
        };
        let mut removed = 0;
        let mut stack = children;
        while let Some(child) = stack.pop() {
            if let Some(node) = self.nodes.remove(&child) {
                if let Some(grandchildren) = node.children() {
                    stack.extend(grandchildren.iter().cloned());
                }
                removed += 1;
            }
            self.parents.remove(&child);
        }
        removed
    }

    pub fn set_loading(&mut self, key: &str, loading: bool) -> bool {
        match self.node_mut(key) {
            Some(node) => {
                node.loading = loading;
                true
            }
            None => false,
        }
    }

    pub fn set_nested(&mut self, key: &str, table: NestedTable) -> bool {
        match self.node_mut(key) {
            Some(node) => {
                node.nested = Some(Arc::new(table));
                node.loading = false;
                true
            }
            None => false,
        }
    }

    /// Merges `patch` into a row's values.
    pub fn patch(&mut self, key: &str, patch: Map<String, Value>) -> bool {
        match self.node_mut(key) {
            Some(node) => {
                for (field, value) in patch {
                    node.values.insert(field, value);
                }
                true
            }
            None => false,
        }
    }

    /// Rebuilds the owned row tree (materialized children only).
    pub fn to_rows(&self) -> Vec<Row> {
        self.roots.iter().filter_map(|key| self.subtree(key)).collect()
    }

    /// Owned copy of a row and its materialized descendants.
    pub fn subtree(&self, key: &str) -> Option<Row> {
        let node = self.get(key)?;
        let mut row = node.to_row();
        row.children = node
            .children()
            .map(|children| children.iter().filter_map(|c| self.subtree(c)).collect());
        Some(row)
    }
}

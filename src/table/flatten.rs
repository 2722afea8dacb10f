//! Projection flattening into the row list the window indexes into.

use crate::model::RowKey;
use crate::table::projector::Projection;
use crate::table::state::TableState;

/// Kind of a flattened row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// A real data row
    Data,
    /// Stand-in shown under a row while its children load
    LoadingPlaceholder,
}

/// A row in display order with its tree metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow {
    /// Row key; placeholders use their parent's key
    pub key: RowKey,
    /// Depth in the tree hierarchy (0 for root)
    pub depth: usize,
    pub kind: RowKind,
    /// For each ancestor level, whether more siblings follow at that level
    pub branch_context: Vec<bool>,
    /// Whether this is the last child of its parent
    pub is_last_child: bool,
    /// Whether an expand control should be drawn
    pub has_children: bool,
    pub expanded: bool,
    /// Expanded with a nested table fragment to draw beneath the row
    pub has_nested: bool,
}

/// Stack frame for the depth-first walk.
struct Frame {
    key: RowKey,
    depth: usize,
    branch_context: Vec<bool>,
    is_last_child: bool,
}

/// Flattens the projected tree, descending only into expanded rows.
///
/// Rows expanded by the user or forced open by search show their projected
/// children; a loading row shows one placeholder instead.
pub fn flatten(state: &TableState, projection: &Projection) -> Vec<VisibleRow> {
    let store = state.rows();
    let mut out = Vec::new();
    let mut stack: Vec<Frame> = push_order(&projection.roots, 0, &[]);

    while let Some(frame) = stack.pop() {
        let Some(node) = store.get(&frame.key) else {
            continue;
        };
        let expanded = state.is_expanded(&frame.key) || projection.force_expanded.contains(&frame.key);
        let children = projection.children_of(&frame.key);

        out.push(VisibleRow {
            key: frame.key.clone(),
            depth: frame.depth,
            kind: RowKind::Data,
            branch_context: frame.branch_context.clone(),
            is_last_child: frame.is_last_child,
            has_children: node.is_expandable() || !children.is_empty(),
            expanded,
            has_nested: expanded && node.nested().is_some(),
        });

        if !expanded {
            continue;
        }
        let mut child_context = frame.branch_context;
        child_context.push(!frame.is_last_child);

        if node.is_loading() {
            out.push(VisibleRow {
                key: frame.key,
                depth: frame.depth + 1,
                kind: RowKind::LoadingPlaceholder,
                branch_context: child_context,
                is_last_child: true,
                has_children: false,
                expanded: false,
                has_nested: false,
            });
            continue;
        }
        stack.extend(push_order(children, frame.depth + 1, &child_context));
    }
    out
}

/// Frames for one sibling list, reversed for LIFO popping.
fn push_order(keys: &[RowKey], depth: usize, context: &[bool]) -> Vec<Frame> {
    let count = keys.len();
    keys.iter()
        .enumerate()
        .rev()
        .map(|(index, key)| Frame {
            key: key.clone(),
            depth,
            branch_context: context.to_vec(),
            is_last_child: index + 1 == count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::field_types::FieldTypeRegistry;
    use crate::model::{ColumnDef, Row};
    use crate::table::projector::project;
    use crate::table::reducer::{reduce, TableAction};

    fn tree_state() -> TableState {
        let state = TableState::new(&TableConfig::default(), vec![ColumnDef::new("name", "Name")]);
        reduce(
            &state,
            TableAction::SetRows(vec![
                Row::new("a").with("name", "a").with_children(vec![
                    Row::new("a1").with("name", "a1"),
                    Row::new("a2").with("name", "a2").lazy(),
                ]),
                Row::new("b").with("name", "b"),
            ]),
        )
    }

    fn keys(rows: &[VisibleRow]) -> Vec<(&str, usize, RowKind)> {
        rows.iter().map(|r| (r.key.as_str(), r.depth, r.kind)).collect()
    }

    #[test]
    fn test_collapsed_rows_hide_children() {
        let state = tree_state();
        let rows = flatten(&state, &project(&state, FieldTypeRegistry::shared()));
        assert_eq!(keys(&rows), vec![("a", 0, RowKind::Data), ("b", 0, RowKind::Data)]);
        assert!(rows[0].has_children);
        assert!(!rows[1].has_children);
        assert!(rows[1].is_last_child);
    }

    #[test]
    fn test_expanded_rows_and_branch_context() {
        let state = reduce(&tree_state(), TableAction::ExpandRow("a".into()));
        let rows = flatten(&state, &project(&state, FieldTypeRegistry::shared()));
        assert_eq!(
            keys(&rows),
            vec![
                ("a", 0, RowKind::Data),
                ("a1", 1, RowKind::Data),
                ("a2", 1, RowKind::Data),
                ("b", 0, RowKind::Data),
            ]
        );
        // "a" has a following sibling, so its children draw a continuing line
        assert_eq!(rows[1].branch_context, vec![true]);
        assert!(rows[2].is_last_child);
        assert!(rows[2].has_children);
    }

    #[test]
    fn test_loading_row_shows_placeholder() {
        let state = reduce(&tree_state(), TableAction::ExpandRow("a".into()));
        let state = reduce(&state, TableAction::AddLoadingRow("a2".into()));
        let rows = flatten(&state, &project(&state, FieldTypeRegistry::shared()));
        assert_eq!(rows[3].kind, RowKind::LoadingPlaceholder);
        assert_eq!(rows[3].key, "a2");
        assert_eq!(rows[3].depth, 2);
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn test_search_forces_ancestors_open() {
        let state = reduce(&tree_state(), TableAction::Search("a2".into()));
        let rows = flatten(&state, &project(&state, FieldTypeRegistry::shared()));
        assert_eq!(keys(&rows), vec![("a", 0, RowKind::Data), ("a2", 1, RowKind::Data)]);
        assert!(rows[0].expanded);
        assert!(!state.is_expanded("a"));
    }
}

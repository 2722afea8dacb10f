//! Synthetic datasets for the viewer and the generator binary.
//!
//! Generation is seeded, so the same options always yield the same rows.
//! Lazy rows get their children from `DemoChildrenProvider`, which derives
//! them from the parent key instead of storing them.

use crate::config::TableConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::field_types::FieldKind;
use crate::model::{ColumnDef, FixedPosition, NestedTable, Row};
use crate::providers::{simulate_latency, CancelToken, ChildrenProvider, NestedTableProvider};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::time::Duration;

const TEAMS: &[&str] = &["core", "infra", "web", "data", "mobile", "security"];
const TAGS: &[&str] = &["urgent", "backlog", "review", "blocked", "docs", "perf", "flaky"];
const WORDS: &[&str] = &[
    "alpha", "bravo", "cedar", "delta", "ember", "fjord", "gamma", "harbor", "iris", "juniper",
    "kepler", "lumen", "maple", "nova", "orbit", "pixel", "quartz", "raven", "sierra", "tundra",
];

/// Epoch milliseconds of 2024-01-01.
const BASE_DATE_MS: i64 = 1_704_067_200_000;
const DAY_MS: i64 = 86_400_000;

/// Shape of a generated dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoOptions {
    pub roots: usize,
    /// Inline child levels below each root
    pub depth: usize,
    /// Inline children per expanded level
    pub children: usize,
    /// Every n-th root is lazy (0 disables lazy rows)
    pub lazy_every: usize,
    pub seed: u64,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            roots: 1_000,
            depth: 1,
            children: 3,
            lazy_every: 10,
            seed: 42,
        }
    }
}

/// Column set used by generated datasets: one fixed column, one group and
/// one value of every field kind.
pub fn demo_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("name", "Name").with_width(220.0).fixed(FixedPosition::Left).sortable(),
        ColumnDef::group(
            "owner",
            "Owner",
            vec![
                ColumnDef::new("owner.name", "Person").sortable(),
                ColumnDef::new("owner.team", "Team").multi_sort(2),
            ],
        ),
        ColumnDef::new("size", "Size").with_type(FieldKind::Number).multi_sort(1),
        ColumnDef::new("active", "Active").with_type(FieldKind::Boolean),
        ColumnDef::new("created", "Created").with_type(FieldKind::Date).sortable(),
        ColumnDef::new("tags", "Tags").with_type(FieldKind::Tags),
        ColumnDef::new("note", "Note").hidden(),
    ]
}

/// Builds a dataset from `options`.
pub fn generate(options: &DemoOptions) -> Dataset {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let rows = (0..options.roots)
        .map(|index| {
            let key = format!("r{index}");
            let row = random_row(&mut rng, &key);
            if options.lazy_every > 0 && index % options.lazy_every == options.lazy_every - 1 {
                row.lazy()
            } else {
                with_inline_children(&mut rng, row, options.depth, options.children)
            }
        })
        .collect();
    log::debug!("generated {} demo roots (seed {})", options.roots, options.seed);
    let mut dataset = Dataset::new(demo_columns(), rows);
    dataset.config = Some(TableConfig::default());
    dataset
}

fn with_inline_children(rng: &mut StdRng, row: Row, depth: usize, children: usize) -> Row {
    if depth == 0 || children == 0 {
        return row;
    }
    let kids = (0..children)
        .map(|i| {
            let child = random_row(rng, &format!("{}/{i}", row.key));
            with_inline_children(rng, child, depth - 1, children)
        })
        .collect();
    row.with_children(kids)
}

fn random_row(rng: &mut StdRng, key: &str) -> Row {
    let word = WORDS[rng.gen_range(0..WORDS.len())];
    let person = WORDS[rng.gen_range(0..WORDS.len())];
    let tag_count = rng.gen_range(0..3);
    let tags: Vec<Value> = (0..tag_count)
        .map(|_| Value::from(TAGS[rng.gen_range(0..TAGS.len())]))
        .collect();

    Row::new(key)
        .with("name", format!("{word}-{}", key.replace('/', ".")))
        .with("owner", json!({ "name": person, "team": TEAMS[rng.gen_range(0..TEAMS.len())] }))
        .with("size", rng.gen_range(1..100_000))
        .with("active", rng.gen_bool(0.7))
        .with("created", BASE_DATE_MS + rng.gen_range(0..365) * DAY_MS)
        .with("tags", tags)
        .with("note", format!("{word} {person}"))
}

/// Seed derived from a row key so lazy children are stable across fetches.
fn key_seed(key: &str) -> u64 {
    key.bytes()
        .fold(0xcbf2_9ce4_8422_2325, |hash, b| (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3))
}

/// Lazily derives children (and a detail table) for generated rows.
#[derive(Debug, Clone)]
pub struct DemoChildrenProvider {
    pub children: usize,
    pub latency: Duration,
}

impl Default for DemoChildrenProvider {
    fn default() -> Self {
        Self {
            children: 5,
            latency: Duration::from_millis(300),
        }
    }
}

impl ChildrenProvider for DemoChildrenProvider {
    fn children(&self, row: &Row, cancel: &CancelToken) -> Result<Vec<Row>> {
        simulate_latency(self.latency, cancel)?;
        let mut rng = StdRng::seed_from_u64(key_seed(&row.key));
        Ok((0..self.children)
            .map(|i| {
                let child = random_row(&mut rng, &format!("{}/{i}", row.key));
                // Every other child can be drilled into further
                if i % 2 == 0 {
                    child.lazy()
                } else {
                    child
                }
            })
            .collect())
    }
}

impl NestedTableProvider for DemoChildrenProvider {
    fn nested_table(&self, row: &Row, cancel: &CancelToken) -> Result<NestedTable> {
        simulate_latency(self.latency, cancel)?;
        let mut rng = StdRng::seed_from_u64(key_seed(&row.key) ^ 0x5eed);
        let columns = vec![
            ColumnDef::new("event", "Event"),
            ColumnDef::new("at", "At").with_type(FieldKind::Date),
        ];
        let rows = (0..3)
            .map(|i| {
                Row::new(&format!("{}#{i}", row.key))
                    .with("event", WORDS[rng.gen_range(0..WORDS.len())])
                    .with("at", BASE_DATE_MS + rng.gen_range(0..365) * DAY_MS)
            })
            .collect();
        Ok(NestedTable { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let options = DemoOptions { roots: 20, ..DemoOptions::default() };
        let a = generate(&options);
        let b = generate(&options);
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.rows.len(), 20);
        // Roots 9 and 19 are lazy, the others carry three inline children
        assert!(a.rows[9].lazy);
        assert_eq!(a.total_rows(), 20 + 18 * 3);
    }

    #[test]
    fn test_nested_values_resolve_by_path() {
        let dataset = generate(&DemoOptions { roots: 1, lazy_every: 0, ..DemoOptions::default() });
        let row = &dataset.rows[0];
        assert!(row.value("owner.team").and_then(Value::as_str).is_some());
        assert!(row.value("size").and_then(Value::as_i64).is_some());
    }

    #[test]
    fn test_lazy_children_are_stable() {
        let provider = DemoChildrenProvider { children: 4, latency: Duration::ZERO };
        let parent = Row::new("r9");
        let first = provider.children(&parent, &CancelToken::new()).unwrap();
        let second = provider.children(&parent, &CancelToken::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[1].key, "r9/1");
        assert!(first[0].lazy && !first[1].lazy);
    }
}

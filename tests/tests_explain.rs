//! Explain-mode tests. These need the sqlite3 shell on PATH, so every
//! test bails out quietly when it is not available.
//!
//! Run with: cargo test --test tests_explain

mod helpers;

use std::process::{Command, Stdio};

use helpers::QueryFixture;
use kypher::query::{KypherQuery, QuerySpec};
use kypher::store::{ExplainMode, SqliteStore};

fn shell_available() -> bool {
    Command::new("sqlite3")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[test]
fn test_explain_plan_mentions_graph_table() {
    if !shell_available() {
        eprintln!("sqlite3 shell not available, skipping");
        return;
    }
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let mut store = SqliteStore::open(&fx.db, true).unwrap();
    let spec = QuerySpec {
        inputs: vec![graph],
        match_clause: "(i)-[:loves]->(c)".to_string(),
        ..QuerySpec::default()
    };
    let mut query = KypherQuery::new(&mut store, spec).unwrap();
    let plan = query.explain(ExplainMode::Plan).unwrap();
    assert!(plan.to_lowercase().contains("graph_1"), "plan was: {plan}");
    // dry-run: no indexes were created
    assert!(!store.has_index("graph_1", "label").unwrap());
}

#[test]
fn test_explain_full_produces_program() {
    if !shell_available() {
        eprintln!("sqlite3 shell not available, skipping");
        return;
    }
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let mut store = SqliteStore::open(&fx.db, true).unwrap();
    let spec = QuerySpec {
        inputs: vec![graph],
        ..QuerySpec::default()
    };
    let mut query = KypherQuery::new(&mut store, spec).unwrap();
    let program = query.explain(ExplainMode::Full).unwrap();
    assert!(!program.trim().is_empty());
}

#[test]
fn test_suggest_indexes_parses_create_index_lines() {
    if !shell_available() {
        eprintln!("sqlite3 shell not available, skipping");
        return;
    }
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let mut store = SqliteStore::open(&fx.db, true).unwrap();
    let handle = store.ensure_graph(&graph).unwrap();
    // a filter on an unindexed column is the advisor's bread and butter
    let sql = format!("SELECT * FROM {} WHERE \"node1\" = 'Joe'", handle.table);
    match store.suggest_indexes(&sql) {
        Ok(suggestions) => {
            for suggestion in suggestions {
                assert_eq!(suggestion.table, handle.table);
                assert!(!suggestion.columns.is_empty());
            }
        }
        // older shells ship without .expert support
        Err(e) => eprintln!("expert mode unavailable: {e}"),
    }
}

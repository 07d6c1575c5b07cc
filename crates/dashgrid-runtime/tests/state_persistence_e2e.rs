//! Layout persistence E2E tests.
//!
//! End-to-end validation of layout write-through and restoration across
//! simulated reloads.
//!
//! # Running Tests
//!
//! ```sh
//! cargo test -p dashgrid-runtime --test state_persistence_e2e
//! ```
//!
//! # Invariants
//!
//! 1. **Write-through**: a reload right after a mutation observes it
//! 2. **Reset clears**: a reload after reset finds no snapshot
//! 3. **Graceful degradation**: corrupt data falls back to the default layout
//! 4. **Edit mode is session-only**: it never survives a reload
//! 5. **Last writer wins**: two sessions on one store converge on the latest save

#![cfg(test)]

use std::sync::Arc;

use dashgrid_core::{CardKind, LayoutState, default_rows};
use dashgrid_runtime::{
    DashboardConfig, EmptyRowPolicy, LayoutStore, MemoryStorage, SnapshotStore, StorageBackend,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Test Utilities
// ============================================================================

fn log_jsonl(event: &str, case: &str, passed: bool, details: &str) {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    eprintln!(
        r#"{{"event":"{event}","case":"{case}","passed":{passed},"details":"{details}","timestamp":{timestamp}}}"#
    );
}

fn session(storage: &Arc<MemoryStorage>) -> LayoutStore {
    LayoutStore::open(SnapshotStore::new(
        Box::new(Arc::clone(storage)),
        SnapshotStore::DEFAULT_KEY,
    ))
}

fn row_ids(store: &LayoutStore, row_id: &str) -> Vec<String> {
    store
        .state()
        .row(row_id)
        .map(|r| r.cards().iter().map(|c| c.id().to_string()).collect())
        .unwrap_or_default()
}

// ============================================================================
// 1. Reload Cycle Tests
// ============================================================================

#[test]
fn reload_observes_every_mutation() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = session(&storage);

    store.move_card("summary", "row-1", "row-2", 0);
    assert_eq!(session(&storage).rows(), store.rows());

    store.reorder_cards_in_row("row-2", 0, 2);
    assert_eq!(session(&storage).rows(), store.rows());

    store.delete_card("orders", "row-1");
    let reloaded = session(&storage);
    assert_eq!(reloaded.rows(), store.rows());
    assert_eq!(reloaded.state().card_count(), 5);

    log_jsonl("persist", "reload_observes_every_mutation", true, "3 mutations");
}

#[test]
fn two_mutations_in_one_tick_keep_the_last_state() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = session(&storage);

    store.move_card("summary", "row-1", "row-3", 0);
    store.move_card("summary", "row-3", "row-2", 1);

    let reloaded = session(&storage);
    assert_eq!(
        row_ids(&reloaded, "row-2"),
        vec!["salesOverTime", "summary", "paymentsHistory"]
    );
    assert_eq!(row_ids(&reloaded, "row-3"), vec!["locationsMap"]);
}

#[test]
fn reset_then_reload_finds_no_snapshot() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = session(&storage);

    store.delete_card("summary", "row-1");
    assert_eq!(store.state().card_count(), 5);
    store.reset_to_default();
    assert_eq!(store.state().card_count(), 6);

    assert!(storage.get(SnapshotStore::DEFAULT_KEY).unwrap().is_none());
    let reloaded = session(&storage);
    assert_eq!(reloaded.state(), &LayoutState::default());

    log_jsonl("persist", "reset_then_reload", true, "snapshot removed");
}

#[test]
fn edit_mode_does_not_survive_reload() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = session(&storage);
    store.toggle_edit_mode();
    store.delete_card("locationsMap", "row-3");

    let reloaded = session(&storage);
    assert!(!reloaded.is_edit_mode());
    assert_eq!(reloaded.rows(), store.rows());
}

#[test]
fn empty_row_survives_reload() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = session(&storage);
    store.delete_card("locationsMap", "row-3");

    let reloaded = session(&storage);
    assert_eq!(reloaded.rows().len(), 3);
    assert!(reloaded.state().row("row-3").is_some_and(|r| r.is_empty()));
}

#[test]
fn pruned_layout_round_trips() {
    let storage = Arc::new(MemoryStorage::new());
    let config = DashboardConfig::default().with_empty_rows(EmptyRowPolicy::Prune);
    let mut store = LayoutStore::with_config(Box::new(Arc::clone(&storage)), &config);
    store.delete_card("locationsMap", "row-3");
    assert_eq!(store.rows().len(), 2);

    let reloaded = LayoutStore::with_config(Box::new(Arc::clone(&storage)), &config);
    assert_eq!(reloaded.rows().len(), 2);
}

// ============================================================================
// 2. Graceful Degradation Tests
// ============================================================================

#[test]
fn corrupt_values_fall_back_to_default() {
    let cases = [
        ("not_json", "not json"),
        ("truncated", r#"[{"id":"row-1","cards":["#),
        ("object", r#"{"rows":[]}"#),
        ("missing_cards", r#"[{"id":"row-1"}]"#),
        ("card_missing_title", r#"[{"id":"r","cards":[{"id":"c","type":"orders"}]}]"#),
        ("duplicate_rows", r#"[{"id":"r","cards":[]},{"id":"r","cards":[]}]"#),
        ("empty_card_id", r#"[{"id":"r","cards":[{"id":"","type":"orders","title":"O"}]}]"#),
    ];
    for (case, raw) in cases {
        let storage = Arc::new(MemoryStorage::with_value(SnapshotStore::DEFAULT_KEY, raw));
        let store = session(&storage);
        let passed = store.state() == &LayoutState::default();
        log_jsonl("degrade", case, passed, "fallback to default");
        assert!(passed, "case {case} did not fall back");
    }
}

#[test]
fn corrupt_snapshot_is_overwritten_by_next_mutation() {
    let storage = Arc::new(MemoryStorage::with_value(
        SnapshotStore::DEFAULT_KEY,
        "not json",
    ));
    let mut store = session(&storage);
    store.delete_card("orders", "row-1");

    let reloaded = session(&storage);
    assert_eq!(reloaded.state().card_count(), 5);
}

#[test]
fn unknown_card_kinds_are_preserved_through_save() {
    let raw = r#"[
        {"id":"row-1","cards":[{"id":"radar","type":"radar","title":"Radar"}]},
        {"id":"row-2","cards":[{"id":"orders","type":"orders","title":"Orders"}]}
    ]"#;
    let storage = Arc::new(MemoryStorage::with_value(SnapshotStore::DEFAULT_KEY, raw));
    let mut store = session(&storage);
    assert_eq!(store.state().card_count(), 2);

    store.move_card("orders", "row-2", "row-1", 0);
    let saved = storage.get(SnapshotStore::DEFAULT_KEY).unwrap().unwrap();
    assert!(saved.contains(r#""type":"radar""#));

    let reloaded = session(&storage);
    let loc = reloaded.find_card("radar").unwrap();
    let card = &reloaded.rows()[loc.row_index].cards()[loc.index];
    assert_eq!(card.kind(), &CardKind::Unknown("radar".into()));
}

// ============================================================================
// 3. Shared Storage Tests
// ============================================================================

#[test]
fn last_writer_wins_across_sessions() {
    let storage = Arc::new(MemoryStorage::new());
    let mut tab_a = session(&storage);
    let mut tab_b = session(&storage);

    tab_a.delete_card("summary", "row-1");
    tab_b.delete_card("orders", "row-1");

    let reloaded = session(&storage);
    assert_eq!(reloaded.rows(), tab_b.rows());
    assert!(reloaded.find_card("summary").is_some());
    assert!(reloaded.find_card("orders").is_none());
}

#[test]
fn custom_key_isolates_dashboards() {
    let storage = Arc::new(MemoryStorage::new());
    let ops = DashboardConfig::default().with_storage_key("ops");
    let sales = DashboardConfig::default().with_storage_key("sales");

    let mut ops_store = LayoutStore::with_config(Box::new(Arc::clone(&storage)), &ops);
    ops_store.delete_card("summary", "row-1");

    let sales_store = LayoutStore::with_config(Box::new(Arc::clone(&storage)), &sales);
    assert_eq!(sales_store.rows(), default_rows().as_slice());
    assert_eq!(storage.len(), 1);
}

// ============================================================================
// 4. File Storage Tests
// ============================================================================

#[cfg(feature = "file-storage")]
mod file_backed {
    use super::*;
    use pretty_assertions::assert_eq;
    use dashgrid_runtime::FileStorage;
    use tempfile::TempDir;

    #[test]
    fn layout_survives_process_restart() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dashgrid").join("state.json");

        {
            let mut store = LayoutStore::open(SnapshotStore::with_file(&path));
            store.move_card("locationsMap", "row-3", "row-1", 0);
        }

        let store = LayoutStore::open(SnapshotStore::with_file(&path));
        assert_eq!(
            row_ids(&store, "row-1"),
            vec!["locationsMap", "summary", "orders", "topProducts"]
        );
        log_jsonl("file", "layout_survives_process_restart", true, "");
    }

    #[test]
    fn reset_removes_state_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");

        let mut store = LayoutStore::open(SnapshotStore::with_file(&path));
        store.delete_card("summary", "row-1");
        assert!(path.exists());

        store.reset_to_default();
        assert!(!path.exists());
    }

    #[test]
    fn truncated_file_falls_back_and_recovers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, r#"{"format_version":1,"entries":{"dashboard-la"#).unwrap();

        let mut store = LayoutStore::open(SnapshotStore::new(
            Box::new(FileStorage::new(&path)),
            SnapshotStore::DEFAULT_KEY,
        ));
        assert_eq!(store.state(), &LayoutState::default());

        store.delete_card("orders", "row-1");
        let reloaded = LayoutStore::open(SnapshotStore::with_file(&path));
        assert_eq!(reloaded.state().card_count(), 5);
    }
}

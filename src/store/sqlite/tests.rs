use super::*;
use crate::domain::{LessonId, PageId};
use crate::store::{PageOrderRepository, QueueChange, QueueRepository, StoreError, SweepCursor};
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

// ===========================================
// Connections
// ===========================================

#[test]
fn open_in_memory_initializes_schema() {
    let store = SqliteStore::open_in_memory().unwrap();

    let table_exists: bool = store
        .conn()
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='export_queue'",
            [],
            |_| Ok(true),
        )
        .unwrap_or(false);

    assert!(table_exists, "export_queue table should exist");
}

#[test]
fn open_creates_file_and_parent_dirs() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("nested").join("store.db");

    let _store = SqliteStore::open(&db_path).unwrap();

    assert!(db_path.exists(), "database file should be created");
}

#[test]
fn data_survives_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");

    {
        let mut store = SqliteStore::open(&db_path).unwrap();
        store
            .save_position(LessonId::new(1), PageId::new(5), 3)
            .unwrap();
    }

    let store = SqliteStore::open(&db_path).unwrap();
    let positions = store.positions(LessonId::new(1)).unwrap();
    assert_eq!(positions.get(&PageId::new(5)), Some(&3));
}

// ===========================================
// Page Order
// ===========================================

#[test]
fn save_position_upserts() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let lesson = LessonId::new(1);

    store.save_position(lesson, PageId::new(5), 0).unwrap();
    store.save_position(lesson, PageId::new(5), 2).unwrap();

    let positions = store.positions(lesson).unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[&PageId::new(5)], 2);
}

#[test]
fn positions_are_scoped_to_lesson() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .save_position(LessonId::new(1), PageId::new(5), 0)
        .unwrap();
    store
        .save_position(LessonId::new(2), PageId::new(6), 0)
        .unwrap();

    let positions = store.positions(LessonId::new(1)).unwrap();
    assert_eq!(positions.len(), 1);
    assert!(positions.contains_key(&PageId::new(5)));
}

// ===========================================
// Export Queue
// ===========================================

#[test]
fn reset_or_insert_inserts_then_resets() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let lesson = LessonId::new(4);

    assert_eq!(store.reset_or_insert(lesson).unwrap(), QueueChange::Inserted);
    assert_eq!(store.reset_or_insert(lesson).unwrap(), QueueChange::Unchanged);

    let entry = store.first_pending(2).unwrap().unwrap();
    assert!(store.increment_attempts(entry.id, 0).unwrap());
    assert_eq!(store.reset_or_insert(lesson).unwrap(), QueueChange::Reset);

    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].attempts, 0);
}

#[test]
fn reset_or_insert_shares_one_row_across_connections() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    let mut first = SqliteStore::open(&db_path).unwrap();
    let mut second = SqliteStore::open(&db_path).unwrap();
    let lesson = LessonId::new(4);

    assert_eq!(first.reset_or_insert(lesson).unwrap(), QueueChange::Inserted);
    assert_eq!(second.reset_or_insert(lesson).unwrap(), QueueChange::Unchanged);

    let entry = second.first_pending(2).unwrap().unwrap();
    assert!(second.increment_attempts(entry.id, 0).unwrap());
    assert_eq!(first.reset_or_insert(lesson).unwrap(), QueueChange::Reset);

    let entries = second.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, entry.id);
    assert_eq!(entries[0].attempts, 0);
}

#[test]
fn first_pending_orders_by_lesson_and_skips_exhausted() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.reset_or_insert(LessonId::new(9)).unwrap();
    store.reset_or_insert(LessonId::new(3)).unwrap();

    let first = store.first_pending(2).unwrap().unwrap();
    assert_eq!(first.lesson, LessonId::new(3));

    for expected in 0..3 {
        assert!(store.increment_attempts(first.id, expected).unwrap());
    }

    let next = store.first_pending(2).unwrap().unwrap();
    assert_eq!(next.lesson, LessonId::new(9));
}

#[test]
fn increment_attempts_checks_expected_value() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.reset_or_insert(LessonId::new(1)).unwrap();
    let entry = store.first_pending(2).unwrap().unwrap();

    assert!(store.increment_attempts(entry.id, 0).unwrap());
    assert!(
        !store.increment_attempts(entry.id, 0).unwrap(),
        "stale expected value must not increment"
    );
    assert_eq!(store.entries().unwrap()[0].attempts, 1);
}

#[test]
fn remove_entry_deletes_and_reports_missing() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.reset_or_insert(LessonId::new(1)).unwrap();
    let entry = store.first_pending(2).unwrap().unwrap();

    store.remove_entry(entry.id).unwrap();
    assert!(store.entries().unwrap().is_empty());

    let err = store.remove_entry(entry.id).unwrap_err();
    assert!(matches!(err, StoreError::EntryNotFound { .. }));
}

// ===========================================
// Sweep Cursor
// ===========================================

#[test]
fn cursor_defaults_to_empty() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert_eq!(store.cursor().unwrap(), SweepCursor::default());
}

#[test]
fn cursor_round_trips() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let cursor = SweepCursor {
        last_run: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        last_queue_update: Some(Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap()),
    };

    store.save_cursor(&cursor).unwrap();
    assert_eq!(store.cursor().unwrap(), cursor);

    store.save_cursor(&SweepCursor::default()).unwrap();
    assert_eq!(store.cursor().unwrap(), SweepCursor::default());
}

#[test]
fn corrupt_cursor_is_reported() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .conn()
        .execute(
            "INSERT INTO sweep_state (key, value) VALUES ('last_run', 'yesterday')",
            [],
        )
        .unwrap();

    assert!(matches!(store.cursor(), Err(StoreError::Corrupt(_))));
}

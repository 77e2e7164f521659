//! SQLite schema for the order and queue store.

use rusqlite::Connection;

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// Creates the store tables.
///
/// Idempotent; calling it on an existing database is safe.
///
/// # Tables Created
/// - `page_order` - Manual position of each page within its lesson
/// - `export_queue` - Lessons awaiting a scheduled export, with attempt counters
/// - `sweep_state` - Scheduled sweep watermarks
/// - `schema_version` - Schema version tracking
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS page_order (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL,
            page_id INTEGER NOT NULL,
            sort_order INTEGER NOT NULL,
            UNIQUE (lesson_id, page_id)
        );
        CREATE INDEX IF NOT EXISTS idx_page_order_lesson ON page_order(lesson_id);",
    )?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS export_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lesson_id INTEGER NOT NULL UNIQUE,
            attempts INTEGER NOT NULL DEFAULT 0 CHECK (attempts >= 0)
        );",
    )?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sweep_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Returns the current schema version.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get(0)
    })
}

//! QueueRepository implementation for SqliteStore.

use super::SqliteStore;
use crate::domain::LessonId;
use crate::store::{QueueChange, QueueEntry, QueueRepository, StoreError, StoreResult, SweepCursor};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

const LAST_RUN_KEY: &str = "last_run";
const LAST_QUEUE_UPDATE_KEY: &str = "last_queue_update";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        lesson: LessonId::new(row.get(1)?),
        attempts: row.get(2)?,
    })
}

impl SqliteStore {
    fn read_timestamp(&self, key: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sweep_state WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| {
                DateTime::parse_from_rfc3339(&v)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| StoreError::Corrupt(format!("invalid {key} timestamp: {e}")))
            })
            .transpose()
    }

    fn write_timestamp(&self, key: &str, value: Option<DateTime<Utc>>) -> StoreResult<()> {
        match value {
            Some(t) => self.conn.execute(
                "INSERT INTO sweep_state (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![key, t.to_rfc3339()],
            )?,
            None => self
                .conn
                .execute("DELETE FROM sweep_state WHERE key = ?", [key])?,
        };
        Ok(())
    }
}

impl QueueRepository for SqliteStore {
    fn reset_or_insert(&mut self, lesson: LessonId) -> StoreResult<QueueChange> {
        // Only labels the result; the upsert below is the single write.
        let existed: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM export_queue WHERE lesson_id = ?)",
            [lesson.get()],
            |row| row.get(0),
        )?;

        let changed = self.conn.execute(
            "INSERT INTO export_queue (lesson_id, attempts) VALUES (?, 0)
             ON CONFLICT (lesson_id) DO UPDATE SET attempts = 0 WHERE attempts <> 0",
            [lesson.get()],
        )?;

        Ok(match (changed, existed) {
            (0, _) => QueueChange::Unchanged,
            (_, true) => QueueChange::Reset,
            (_, false) => QueueChange::Inserted,
        })
    }

    fn first_pending(&self, max_attempts: u32) -> StoreResult<Option<QueueEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT id, lesson_id, attempts FROM export_queue
                 WHERE attempts <= ?
                 ORDER BY lesson_id, id
                 LIMIT 1",
                [max_attempts],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn increment_attempts(&mut self, id: i64, expected: u32) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE export_queue SET attempts = attempts + 1 WHERE id = ?1 AND attempts = ?2",
            params![id, expected],
        )?;
        Ok(changed == 1)
    }

    fn remove_entry(&mut self, id: i64) -> StoreResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM export_queue WHERE id = ?", [id])?;
        if removed == 0 {
            return Err(StoreError::EntryNotFound { id });
        }
        Ok(())
    }

    fn entries(&self) -> StoreResult<Vec<QueueEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, lesson_id, attempts FROM export_queue ORDER BY lesson_id, id")?;
        let rows = stmt.query_map([], entry_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn cursor(&self) -> StoreResult<SweepCursor> {
        Ok(SweepCursor {
            last_run: self.read_timestamp(LAST_RUN_KEY)?,
            last_queue_update: self.read_timestamp(LAST_QUEUE_UPDATE_KEY)?,
        })
    }

    fn save_cursor(&mut self, cursor: &SweepCursor) -> StoreResult<()> {
        self.write_timestamp(LAST_RUN_KEY, cursor.last_run)?;
        self.write_timestamp(LAST_QUEUE_UPDATE_KEY, cursor.last_queue_update)?;
        Ok(())
    }
}

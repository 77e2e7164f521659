//! Repository traits for page order and the export queue.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{LessonId, PageId};

// ===========================================
// StoreError Type
// ===========================================

/// Errors that can occur in order or queue storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The page has no stored position.
    #[error("page {page} has no stored position")]
    PageNotFound { page: i64 },

    /// The queue entry does not exist (already removed).
    #[error("queue entry {id} not found")]
    EntryNotFound { id: i64 },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored value could not be decoded.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    /// An I/O error occurred.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ===========================================
// Queue Types
// ===========================================

/// A lesson waiting for a scheduled export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub id: i64,
    pub lesson: LessonId,
    /// Processing attempts made so far.
    pub attempts: u32,
}

/// What `reset_or_insert` did to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueChange {
    Inserted,
    /// An existing entry had its attempts reset to zero.
    Reset,
    /// The entry was already at zero attempts.
    Unchanged,
}

/// Persistent progress of the scheduled sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepCursor {
    /// When the sweep last ran; `None` before the first run.
    pub last_run: Option<DateTime<Utc>>,
    /// Watermark used to detect lesson changes.
    pub last_queue_update: Option<DateTime<Utc>>,
}

impl SweepCursor {
    /// Changes after this instant put a lesson back in the queue.
    pub fn changes_since(&self) -> Option<DateTime<Utc>> {
        self.last_queue_update.or(self.last_run)
    }
}

// ===========================================
// Repository Traits
// ===========================================

/// Storage for the manual page order of each lesson.
pub trait PageOrderRepository {
    /// Returns every stored position for the lesson.
    fn positions(&self, lesson: LessonId) -> StoreResult<HashMap<PageId, i64>>;

    /// Stores a page's position, creating the row on first use.
    fn save_position(&mut self, lesson: LessonId, page: PageId, position: i64) -> StoreResult<()>;
}

/// Storage for the export retry queue and the sweep cursor.
pub trait QueueRepository {
    /// Queues the lesson with zero attempts, or resets a non-zero counter.
    fn reset_or_insert(&mut self, lesson: LessonId) -> StoreResult<QueueChange>;

    /// Returns the entry with the lowest lesson id whose attempts are at most
    /// `max_attempts`.
    fn first_pending(&self, max_attempts: u32) -> StoreResult<Option<QueueEntry>>;

    /// Sets `attempts = expected + 1` only if the stored counter still equals
    /// `expected`. Returns false when another writer got there first.
    fn increment_attempts(&mut self, id: i64, expected: u32) -> StoreResult<bool>;

    /// Deletes an entry.
    fn remove_entry(&mut self, id: i64) -> StoreResult<()>;

    /// Returns every entry, ordered by lesson id.
    fn entries(&self) -> StoreResult<Vec<QueueEntry>>;

    fn cursor(&self) -> StoreResult<SweepCursor>;

    fn save_cursor(&mut self, cursor: &SweepCursor) -> StoreResult<()>;
}

//! In-memory store, for tests and one-off runs that need no persistence.

use std::collections::HashMap;

use crate::domain::{LessonId, PageId};

use super::{
    PageOrderRepository, QueueChange, QueueEntry, QueueRepository, StoreError, StoreResult,
    SweepCursor,
};

/// Keeps page order, queue entries and the sweep cursor in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    positions: HashMap<LessonId, HashMap<PageId, i64>>,
    queue: Vec<QueueEntry>,
    next_entry_id: i64,
    cursor: SweepCursor,
    /// Every `save_position` call, in order.
    writes: Vec<(PageId, i64)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the position writes performed so far.
    pub fn position_writes(&self) -> &[(PageId, i64)] {
        &self.writes
    }

    /// Forgets the recorded position writes.
    pub fn clear_position_writes(&mut self) {
        self.writes.clear();
    }
}

impl PageOrderRepository for MemoryStore {
    fn positions(&self, lesson: LessonId) -> StoreResult<HashMap<PageId, i64>> {
        Ok(self.positions.get(&lesson).cloned().unwrap_or_default())
    }

    fn save_position(&mut self, lesson: LessonId, page: PageId, position: i64) -> StoreResult<()> {
        self.positions
            .entry(lesson)
            .or_default()
            .insert(page, position);
        self.writes.push((page, position));
        Ok(())
    }
}

impl QueueRepository for MemoryStore {
    fn reset_or_insert(&mut self, lesson: LessonId) -> StoreResult<QueueChange> {
        if let Some(entry) = self.queue.iter_mut().find(|e| e.lesson == lesson) {
            if entry.attempts == 0 {
                return Ok(QueueChange::Unchanged);
            }
            entry.attempts = 0;
            return Ok(QueueChange::Reset);
        }

        self.next_entry_id += 1;
        self.queue.push(QueueEntry {
            id: self.next_entry_id,
            lesson,
            attempts: 0,
        });
        Ok(QueueChange::Inserted)
    }

    fn first_pending(&self, max_attempts: u32) -> StoreResult<Option<QueueEntry>> {
        Ok(self
            .queue
            .iter()
            .filter(|e| e.attempts <= max_attempts)
            .min_by_key(|e| (e.lesson, e.id))
            .copied())
    }

    fn increment_attempts(&mut self, id: i64, expected: u32) -> StoreResult<bool> {
        match self.queue.iter_mut().find(|e| e.id == id) {
            Some(entry) if entry.attempts == expected => {
                entry.attempts += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn remove_entry(&mut self, id: i64) -> StoreResult<()> {
        let before = self.queue.len();
        self.queue.retain(|e| e.id != id);
        if self.queue.len() == before {
            return Err(StoreError::EntryNotFound { id });
        }
        Ok(())
    }

    fn entries(&self) -> StoreResult<Vec<QueueEntry>> {
        let mut entries = self.queue.clone();
        entries.sort_by_key(|e| (e.lesson, e.id));
        Ok(entries)
    }

    fn cursor(&self) -> StoreResult<SweepCursor> {
        Ok(self.cursor)
    }

    fn save_cursor(&mut self, cursor: &SweepCursor) -> StoreResult<()> {
        self.cursor = *cursor;
        Ok(())
    }
}

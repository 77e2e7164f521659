//! Export queue with bounded retries.
//!
//! A lesson enters the queue when one of its pages changes, and stays there
//! until an export of it succeeds. Every hand-out bumps its attempt counter,
//! so a lesson that keeps failing eventually stops being handed out.

mod sweep;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::host::LessonSource;
use crate::store::{QueueChange, QueueEntry, QueueRepository};

pub use sweep::{SkipReason, SweepReport, run_scheduled_sweep};

/// What one `refresh` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Lessons queued for the first time.
    pub inserted: usize,
    /// Queued lessons whose attempts went back to zero.
    pub reset: usize,
    /// Lessons already queued at zero attempts.
    pub unchanged: usize,
}

impl RefreshReport {
    pub fn total(&self) -> usize {
        self.inserted + self.reset + self.unchanged
    }
}

/// The retry queue over a [`QueueRepository`].
pub struct ExportQueue<'r, R: QueueRepository + ?Sized> {
    repo: &'r mut R,
    max_attempts: u32,
}

impl<'r, R: QueueRepository + ?Sized> ExportQueue<'r, R> {
    pub fn new(repo: &'r mut R, max_attempts: u32) -> Self {
        Self { repo, max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Queues every lesson changed after `since` and moves the change
    /// watermark to `now`.
    ///
    /// Lessons already queued get their attempts reset, so a lesson that ran
    /// out of retries is tried again once someone edits it.
    pub fn refresh<S: LessonSource + ?Sized>(
        &mut self,
        source: &S,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();
        for lesson in source.lessons_modified_since(since)? {
            match self.repo.reset_or_insert(lesson)? {
                QueueChange::Inserted => report.inserted += 1,
                QueueChange::Reset => report.reset += 1,
                QueueChange::Unchanged => report.unchanged += 1,
            }
        }

        let mut cursor = self.repo.cursor()?;
        cursor.last_queue_update = Some(now);
        self.repo.save_cursor(&cursor)?;

        info!(
            since = %since,
            inserted = report.inserted,
            reset = report.reset,
            "refreshed export queue"
        );
        Ok(report)
    }

    /// Hands out the next entry and records the attempt.
    ///
    /// Returns the entry with its attempt count from before this hand-out.
    /// When another writer claims the same row first, the lookup starts over.
    pub fn next_pending(&mut self) -> Result<Option<QueueEntry>> {
        loop {
            let Some(entry) = self.repo.first_pending(self.max_attempts)? else {
                return Ok(None);
            };
            if self.repo.increment_attempts(entry.id, entry.attempts)? {
                debug!(lesson = %entry.lesson, attempts = entry.attempts, "claimed queue entry");
                return Ok(Some(entry));
            }
            debug!(entry = entry.id, "queue entry claimed elsewhere, retrying");
        }
    }

    /// Whether this hand-out is the last one the entry gets.
    pub fn is_final_attempt(&self, entry: &QueueEntry) -> bool {
        entry.attempts == self.max_attempts
    }

    /// Drops an entry after its export succeeded.
    pub fn remove(&mut self, entry: &QueueEntry) -> Result<()> {
        self.repo.remove_entry(entry.id)?;
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<QueueEntry>> {
        Ok(self.repo.entries()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnswerRecord, Lesson, LessonId, ModuleContext, PageId, PageRecord};
    use crate::error::ExportError;
    use crate::store::{MemoryStore, StoreResult, SweepCursor};
    use chrono::TimeZone;

    struct Changed(Vec<i64>);

    impl LessonSource for Changed {
        fn lesson(&self, _id: LessonId) -> Result<Lesson> {
            Err(ExportError::not_found("lesson"))
        }
        fn module_context(&self, _lesson: LessonId) -> Result<ModuleContext> {
            Err(ExportError::not_found("module"))
        }
        fn pages(&self, _lesson: LessonId) -> Result<Vec<PageRecord>> {
            Ok(Vec::new())
        }
        fn answers(&self, _page: PageId) -> Result<Vec<AnswerRecord>> {
            Ok(Vec::new())
        }
        fn lessons_modified_since(&self, _since: DateTime<Utc>) -> Result<Vec<LessonId>> {
            Ok(self.0.iter().copied().map(LessonId::new).collect())
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn refresh_inserts_and_advances_watermark() {
        let mut store = MemoryStore::new();
        let mut queue = ExportQueue::new(&mut store, 2);

        let report = queue.refresh(&Changed(vec![5, 2]), at(1), at(2)).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.total(), 2);

        let lessons: Vec<_> = queue.entries().unwrap().iter().map(|e| e.lesson).collect();
        assert_eq!(lessons, vec![LessonId::new(2), LessonId::new(5)]);
        assert_eq!(store.cursor().unwrap().last_queue_update, Some(at(2)));
    }

    #[test]
    fn refresh_resets_attempts_of_changed_lessons() {
        let mut store = MemoryStore::new();
        let mut queue = ExportQueue::new(&mut store, 2);
        queue.refresh(&Changed(vec![1]), at(1), at(2)).unwrap();
        queue.next_pending().unwrap().unwrap();

        let report = queue.refresh(&Changed(vec![1]), at(2), at(3)).unwrap();
        assert_eq!(report.reset, 1);
        assert_eq!(queue.entries().unwrap()[0].attempts, 0);
    }

    #[test]
    fn next_pending_returns_pre_increment_count() {
        let mut store = MemoryStore::new();
        let mut queue = ExportQueue::new(&mut store, 2);
        queue.refresh(&Changed(vec![1]), at(1), at(2)).unwrap();

        let counts: Vec<u32> = std::iter::from_fn(|| queue.next_pending().unwrap())
            .map(|e| e.attempts)
            .collect();

        assert_eq!(counts, vec![0, 1, 2]);
        assert!(queue.next_pending().unwrap().is_none());
        assert_eq!(queue.entries().unwrap()[0].attempts, 3, "entry is kept");
    }

    #[test]
    fn final_attempt_is_the_one_at_max() {
        let mut store = MemoryStore::new();
        let mut queue = ExportQueue::new(&mut store, 2);
        queue.refresh(&Changed(vec![1]), at(1), at(2)).unwrap();

        let mut finals = 0;
        while let Some(entry) = queue.next_pending().unwrap() {
            if queue.is_final_attempt(&entry) {
                finals += 1;
            }
        }
        assert_eq!(finals, 1);
    }

    #[test]
    fn remove_deletes_entry() {
        let mut store = MemoryStore::new();
        let mut queue = ExportQueue::new(&mut store, 2);
        queue.refresh(&Changed(vec![1, 2]), at(1), at(2)).unwrap();

        let entry = queue.next_pending().unwrap().unwrap();
        queue.remove(&entry).unwrap();

        let next = queue.next_pending().unwrap().unwrap();
        assert_eq!(next.lesson, LessonId::new(2));
    }

    /// Loses the first compare-and-set, as if another process claimed the row.
    struct Contended {
        inner: MemoryStore,
        lose_next: bool,
    }

    impl QueueRepository for Contended {
        fn reset_or_insert(&mut self, lesson: LessonId) -> StoreResult<QueueChange> {
            self.inner.reset_or_insert(lesson)
        }
        fn first_pending(&self, max_attempts: u32) -> StoreResult<Option<QueueEntry>> {
            self.inner.first_pending(max_attempts)
        }
        fn increment_attempts(&mut self, id: i64, expected: u32) -> StoreResult<bool> {
            if std::mem::take(&mut self.lose_next) {
                self.inner.increment_attempts(id, expected)?;
                return Ok(false);
            }
            self.inner.increment_attempts(id, expected)
        }
        fn remove_entry(&mut self, id: i64) -> StoreResult<()> {
            self.inner.remove_entry(id)
        }
        fn entries(&self) -> StoreResult<Vec<QueueEntry>> {
            self.inner.entries()
        }
        fn cursor(&self) -> StoreResult<SweepCursor> {
            self.inner.cursor()
        }
        fn save_cursor(&mut self, cursor: &SweepCursor) -> StoreResult<()> {
            self.inner.save_cursor(cursor)
        }
    }

    #[test]
    fn lost_claim_is_retried_with_fresh_count() {
        let mut store = Contended {
            inner: MemoryStore::new(),
            lose_next: true,
        };
        store.reset_or_insert(LessonId::new(1)).unwrap();

        let mut queue = ExportQueue::new(&mut store, 2);
        let entry = queue.next_pending().unwrap().unwrap();
        assert_eq!(entry.attempts, 1);
        assert_eq!(queue.entries().unwrap()[0].attempts, 2);
    }
}

//! PageOrderRepository implementation for SqliteStore.

use super::SqliteStore;
use crate::domain::{LessonId, PageId};
use crate::store::{PageOrderRepository, StoreResult};
use std::collections::HashMap;

impl PageOrderRepository for SqliteStore {
    fn positions(&self, lesson: LessonId) -> StoreResult<HashMap<PageId, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT page_id, sort_order FROM page_order WHERE lesson_id = ?")?;

        let rows = stmt.query_map([lesson.get()], |row| {
            Ok((PageId::new(row.get(0)?), row.get::<_, i64>(1)?))
        })?;

        let mut positions = HashMap::new();
        for row in rows {
            let (page, position) = row?;
            positions.insert(page, position);
        }
        Ok(positions)
    }

    fn save_position(&mut self, lesson: LessonId, page: PageId, position: i64) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO page_order (lesson_id, page_id, sort_order) VALUES (?1, ?2, ?3)
             ON CONFLICT (lesson_id, page_id) DO UPDATE SET sort_order = excluded.sort_order",
            [lesson.get(), page.get(), position],
        )?;
        Ok(())
    }
}

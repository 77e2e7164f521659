//! Manual page order of a lesson.
//!
//! Positions are dense integers from zero. Every load re-indexes the pages,
//! so gaps or duplicates left by deleted or newly added pages disappear the
//! next time the lesson is opened.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::{LessonId, Page, PageId};
use crate::error::{ExportError, Result};
use crate::host::LessonSource;
use crate::store::PageOrderRepository;

/// One row of the reorder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderListing {
    pub id: PageId,
    pub title: String,
    pub position: i64,
    pub can_move_up: bool,
    pub can_move_down: bool,
}

/// The ordered pages of one lesson, with write-through to a repository.
pub struct PageOrderStore<'r, R: PageOrderRepository + ?Sized> {
    repo: &'r mut R,
    lesson: LessonId,
    pages: Vec<Page>,
}

impl<'r, R: PageOrderRepository + ?Sized> PageOrderStore<'r, R> {
    /// Loads the lesson's pages in manual order and re-indexes them to `0..n`.
    ///
    /// Pages with a stored position come first, by position then title;
    /// pages never positioned follow, by title. Every position that changes is
    /// written back.
    pub fn load<S: LessonSource + ?Sized>(
        repo: &'r mut R,
        source: &S,
        lesson: LessonId,
    ) -> Result<Self> {
        let stored = repo.positions(lesson)?;
        let mut keyed: Vec<(Option<i64>, Page)> = source
            .pages(lesson)?
            .into_iter()
            .map(|record| {
                let key = stored.get(&record.id).copied();
                (key, Page::from_record(record, -1))
            })
            .collect();

        keyed.sort_by(|(ka, a), (kb, b)| match (ka, kb) {
            (Some(x), Some(y)) => x.cmp(y).then_with(|| a.title.cmp(&b.title)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.title.cmp(&b.title),
        });

        let mut pages = Vec::with_capacity(keyed.len());
        for (index, (key, mut page)) in keyed.into_iter().enumerate() {
            let position = index as i64;
            if key != Some(position) {
                repo.save_position(lesson, page.id, position)?;
            }
            page.position = position;
            pages.push(page);
        }

        debug!(lesson = %lesson, pages = pages.len(), "loaded page order");
        Ok(Self {
            repo,
            lesson,
            pages,
        })
    }

    /// Pages in position order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    /// Returns the current position of a page.
    pub fn position_of(&self, page: PageId) -> Result<i64> {
        self.pages
            .iter()
            .find(|p| p.id == page)
            .map(|p| p.position)
            .ok_or_else(|| ExportError::not_found(format!("page {page}")))
    }

    /// Moves a page to `new_pos`, shifting the pages in between by one.
    ///
    /// Does nothing for a negative target or the current position. A target
    /// past the end lands one after the last of the other pages. Returns
    /// whether anything moved.
    pub fn move_to(&mut self, page: PageId, new_pos: i64) -> Result<bool> {
        let old_pos = self.position_of(page)?;
        if new_pos < 0 || new_pos == old_pos {
            return Ok(false);
        }

        let moving_up = new_pos < old_pos;
        let mut max_other: Option<i64> = None;
        for other in self.pages.iter_mut().filter(|p| p.id != page) {
            let shifted = if moving_up {
                (new_pos..old_pos).contains(&other.position).then(|| other.position + 1)
            } else {
                (old_pos + 1..=new_pos).contains(&other.position).then(|| other.position - 1)
            };
            if let Some(position) = shifted {
                other.position = position;
                self.repo.save_position(self.lesson, other.id, position)?;
            }
            max_other = max_other.max(Some(other.position));
        }

        let limit = max_other.map_or(0, |m| m + 1);
        let target = new_pos.min(limit);
        if target != old_pos {
            self.repo.save_position(self.lesson, page, target)?;
        }
        if let Some(moved) = self.pages.iter_mut().find(|p| p.id == page) {
            moved.position = target;
        }

        self.pages.sort_by_key(|p| p.position);
        debug!(lesson = %self.lesson, page = %page, from = old_pos, to = target, "moved page");
        Ok(target != old_pos)
    }

    pub fn move_up(&mut self, page: PageId) -> Result<bool> {
        let current = self.position_of(page)?;
        self.move_to(page, current - 1)
    }

    pub fn move_down(&mut self, page: PageId) -> Result<bool> {
        let current = self.position_of(page)?;
        self.move_to(page, current + 1)
    }

    /// Page id to position, for the reorder endpoint.
    pub fn order_map(&self) -> BTreeMap<PageId, i64> {
        self.pages.iter().map(|p| (p.id, p.position)).collect()
    }

    /// Rows for a reorder UI. The first page never moves, and the page
    /// right after it cannot move up past it.
    pub fn listing(&self) -> Vec<OrderListing> {
        let last = self.pages.last().map_or(0, |p| p.position);
        self.pages
            .iter()
            .map(|p| OrderListing {
                id: p.id,
                title: p.title.clone(),
                position: p.position,
                can_move_up: p.position > 1,
                can_move_down: p.position != 0 && p.position < last,
            })
            .collect()
    }
}

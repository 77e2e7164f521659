//! Lessons, their course placement, and the derived info block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContextId, LessonId, ModuleId, Page, UserId};

/// Format used for every human-facing timestamp on covers and in filenames.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A lesson as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    pub id: LessonId,
    pub name: String,
    /// Intro HTML, shown as the cover description.
    pub intro: String,
}

/// How a course module separates its users into groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    #[default]
    None,
    /// Members only see their own group.
    Separate,
    /// Members see every group but only act in their own.
    Visible,
}

impl GroupMode {
    /// Maps the host's integer encoding (0, 1, 2).
    pub fn from_host(raw: i64) -> Self {
        match raw {
            1 => GroupMode::Separate,
            2 => GroupMode::Visible,
            _ => GroupMode::None,
        }
    }
}

/// Where a lesson sits in the host: module, permission context and course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleContext {
    pub module_id: ModuleId,
    pub context_id: ContextId,
    pub course_id: i64,
    pub lesson_id: LessonId,
    pub group_mode: GroupMode,
}

/// Summary of the page set printed on the cover.
///
/// Built once per export by folding every page in; never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonInfo {
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
    modified_by: Option<UserId>,
    modified_by_name: Option<String>,
    printed: Option<DateTime<Utc>>,
}

impl LessonInfo {
    /// Starts an empty fold, stamped with the export ("printed") time.
    pub fn new(printed: DateTime<Utc>) -> Self {
        Self {
            created: None,
            modified: None,
            modified_by: None,
            modified_by_name: None,
            printed: Some(printed),
        }
    }

    /// Starts an empty fold without a printed time.
    pub fn unprinted() -> Self {
        Self {
            printed: None,
            ..Self::new(DateTime::<Utc>::MIN_UTC)
        }
    }

    /// Folds one page in.
    ///
    /// Keeps the earliest creation and the latest modification. Pages without
    /// a recorded modifier credit `acting_user`. Hosts store an unset time as
    /// zero, so times at or before the epoch are ignored.
    pub fn record(&mut self, page: &Page, acting_user: UserId) {
        if is_set(page.created) && self.created.is_none_or(|c| page.created < c) {
            self.created = Some(page.created);
        }
        if is_set(page.modified) && self.modified.is_none_or(|m| page.modified > m) {
            self.modified = Some(page.modified);
            let by = page.modified_by.unwrap_or(acting_user);
            if self.modified_by != Some(by) {
                self.modified_by = Some(by);
                self.modified_by_name = None;
            }
        }
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    pub fn printed(&self) -> Option<DateTime<Utc>> {
        self.printed
    }

    /// The user credited with the latest modification.
    pub fn modified_by(&self) -> Option<UserId> {
        self.modified_by
    }

    /// Attaches the display name for [`modified_by`](Self::modified_by).
    pub fn set_modified_by_name(&mut self, name: impl Into<String>) {
        self.modified_by_name = Some(name.into());
    }

    /// Returns the info block lines, omitting any whose data is missing.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(modified) = self.modified {
            let who = self.modified_by_name.as_deref().unwrap_or("unknown user");
            lines.push(format!(
                "Last modified by {} at {}",
                who,
                modified.format(DISPLAY_TIME_FORMAT)
            ));
        }
        if let Some(printed) = self.printed {
            lines.push(format!("Exported at {}", printed.format(DISPLAY_TIME_FORMAT)));
        }
        lines
    }
}

fn is_set(time: DateTime<Utc>) -> bool {
    time > DateTime::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PageId, PageKind};
    use chrono::TimeZone;

    fn page(id: i64, created: i64, modified: i64, by: Option<i64>) -> Page {
        Page {
            id: PageId::new(id),
            title: format!("Page {id}"),
            contents: String::new(),
            kind: PageKind::Plain,
            created: Utc.timestamp_opt(created, 0).unwrap(),
            modified: Utc.timestamp_opt(modified, 0).unwrap(),
            modified_by: by.map(UserId::new),
            position: 0,
            answers: Vec::new(),
        }
    }

    #[test]
    fn keeps_earliest_creation_and_latest_modification() {
        let mut info = LessonInfo::unprinted();
        info.record(&page(1, 100, 500, Some(3)), UserId::new(9));
        info.record(&page(2, 50, 900, Some(4)), UserId::new(9));
        info.record(&page(3, 70, 600, Some(5)), UserId::new(9));

        assert_eq!(info.created().unwrap().timestamp(), 50);
        assert_eq!(info.modified().unwrap().timestamp(), 900);
        assert_eq!(info.modified_by(), Some(UserId::new(4)));
    }

    #[test]
    fn missing_modifier_credits_acting_user() {
        let mut info = LessonInfo::unprinted();
        info.record(&page(1, 0, 10, None), UserId::new(9));
        assert_eq!(info.modified_by(), Some(UserId::new(9)));
    }

    #[test]
    fn lines_omit_unset_parts() {
        let info = LessonInfo::unprinted();
        assert!(info.lines().is_empty());

        let printed = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let info = LessonInfo::new(printed);
        assert_eq!(info.lines(), vec!["Exported at 2024-03-01 09:30".to_string()]);
    }

    #[test]
    fn unset_page_times_are_ignored() {
        let printed = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut info = LessonInfo::new(printed);
        info.record(&page(1, 0, 0, Some(2)), UserId::new(9));
        info.set_modified_by_name("Ada");

        assert_eq!(info.created(), None);
        assert_eq!(info.modified(), None);
        assert_eq!(info.lines(), vec!["Exported at 2024-03-01 09:30".to_string()]);
    }

    #[test]
    fn lines_include_modifier_name() {
        let mut info = LessonInfo::unprinted();
        info.record(&page(1, 0, 1_700_000_000, Some(2)), UserId::new(9));
        info.set_modified_by_name("Ada Lovelace");
        let lines = info.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Last modified by Ada Lovelace at 2023-11-14"));
    }

    #[test]
    fn group_mode_maps_host_integers() {
        assert_eq!(GroupMode::from_host(0), GroupMode::None);
        assert_eq!(GroupMode::from_host(1), GroupMode::Separate);
        assert_eq!(GroupMode::from_host(2), GroupMode::Visible);
    }
}

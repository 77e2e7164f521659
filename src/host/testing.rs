//! In-memory host used by unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{
    AnswerRecord, ContextId, GroupId, GroupMode, Lesson, LessonId, ModuleContext, ModuleId,
    PageId, PageKind, PageRecord, UserId,
};
use crate::error::{ExportError, Result};
use crate::rewrite::MediaRef;

use super::{
    AccessControl, ContentFormatter, FileStore, LessonSource, Notification, Notifier,
    RichTextOptions, StoredFile,
};

pub const CONTEXT: ContextId = ContextId::new(20);
pub const TEACHER: UserId = UserId::new(2);
pub const STUDENT: UserId = UserId::new(3);

/// A notification as it was sent, plus whether its attachment existed then.
#[derive(Debug, Clone)]
pub struct Sent {
    pub notification: Notification,
    pub attachment_existed: bool,
}

pub struct FakeHost {
    pub site_url: String,
    pub lessons: HashMap<LessonId, Lesson>,
    pub group_mode: GroupMode,
    pub pages: Vec<PageRecord>,
    pub answers: HashMap<PageId, Vec<AnswerRecord>>,
    pub capabilities: HashSet<(String, UserId)>,
    pub members: HashSet<(GroupId, UserId)>,
    pub names: HashMap<UserId, String>,
    pub files: HashMap<String, StoredFile>,
    pub changed: Vec<LessonId>,
    pub sent: RefCell<Vec<Sent>>,
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

impl FakeHost {
    /// Lesson 1, "Intro": a welcome page then a true/false question whose
    /// only answer is "True".
    pub fn intro() -> Self {
        let page = |id: i64, title: &str, contents: &str, kind: PageKind, modified: i64| PageRecord {
            id: PageId::new(id),
            title: title.to_string(),
            contents: contents.to_string(),
            kind,
            created: at(1_000),
            modified: at(modified),
            modified_by: Some(TEACHER),
        };

        let mut lessons = HashMap::new();
        lessons.insert(
            LessonId::new(1),
            Lesson {
                id: LessonId::new(1),
                name: "Intro".to_string(),
                intro: "<p>Getting started</p>".to_string(),
            },
        );

        let mut answers = HashMap::new();
        answers.insert(PageId::new(11), vec![AnswerRecord::new(1, "True")]);

        Self {
            site_url: "http://localhost".to_string(),
            lessons,
            group_mode: GroupMode::None,
            pages: vec![
                page(10, "Welcome", "<p>Hello class</p>", PageKind::Plain, 2_000),
                page(11, "Quiz", "<p>Is it?</p>", PageKind::TrueFalse, 3_000),
            ],
            answers,
            capabilities: HashSet::new(),
            members: HashSet::new(),
            names: HashMap::from([(TEACHER, "Ada Lovelace".to_string())]),
            files: HashMap::new(),
            changed: Vec::new(),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn grant(mut self, capability: &str, user: UserId) -> Self {
        self.capabilities.insert((capability.to_string(), user));
        self
    }

    pub fn with_lesson(mut self, id: i64, name: &str) -> Self {
        let id = LessonId::new(id);
        self.lessons.insert(
            id,
            Lesson {
                id,
                name: name.to_string(),
                intro: String::new(),
            },
        );
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.borrow().clone()
    }
}

impl LessonSource for FakeHost {
    fn lesson(&self, id: LessonId) -> Result<Lesson> {
        self.lessons
            .get(&id)
            .cloned()
            .ok_or_else(|| ExportError::not_found(format!("lesson {id}")))
    }

    fn module_context(&self, lesson: LessonId) -> Result<ModuleContext> {
        self.lesson(lesson)?;
        Ok(ModuleContext {
            module_id: ModuleId::new(100 + lesson.get()),
            context_id: CONTEXT,
            course_id: 1,
            lesson_id: lesson,
            group_mode: self.group_mode,
        })
    }

    fn pages(&self, _lesson: LessonId) -> Result<Vec<PageRecord>> {
        Ok(self.pages.clone())
    }

    fn answers(&self, page: PageId) -> Result<Vec<AnswerRecord>> {
        Ok(self.answers.get(&page).cloned().unwrap_or_default())
    }

    fn lessons_modified_since(&self, _since: DateTime<Utc>) -> Result<Vec<LessonId>> {
        Ok(self.changed.clone())
    }
}

impl ContentFormatter for FakeHost {
    fn rewrite_media_urls(&self, html: &str, context: ContextId, page: PageId) -> String {
        html.replace(
            "@@PLUGINFILE@@",
            &format!(
                "{}/pluginfile.php/{context}/mod_lesson/page_contents/{page}",
                self.site_url
            ),
        )
    }

    fn render_rich_text(&self, html: &str, _options: &RichTextOptions) -> String {
        html.to_string()
    }
}

impl FileStore for FakeHost {
    fn find_file(&self, media: &MediaRef) -> Result<Option<StoredFile>> {
        Ok(self.files.get(&media.file_name).cloned())
    }
}

impl AccessControl for FakeHost {
    fn has_capability(&self, capability: &str, _context: ContextId, user: UserId) -> Result<bool> {
        Ok(self.capabilities.contains(&(capability.to_string(), user)))
    }

    fn is_group_member(&self, group: GroupId, user: UserId) -> Result<bool> {
        Ok(self.members.contains(&(group, user)))
    }

    fn user_fullname(&self, user: UserId) -> Result<Option<String>> {
        Ok(self.names.get(&user).cloned())
    }
}

impl Notifier for FakeHost {
    fn send_notification(&self, notification: &Notification) -> Result<()> {
        let attachment_existed = notification
            .attachment
            .as_ref()
            .is_some_and(|a| a.path.exists());
        self.sent.borrow_mut().push(Sent {
            notification: notification.clone(),
            attachment_existed,
        });
        Ok(())
    }
}

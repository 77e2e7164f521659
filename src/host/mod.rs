//! Interfaces the exporter consumes from its host application.
//!
//! The host owns lessons, users, groups, files and messaging. The exporter only
//! sees it through these traits; [`SqliteHost`] is a self-contained reference
//! implementation backed by a handful of host tables.

mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::domain::{
    AnswerRecord, ContextId, GroupId, Lesson, LessonId, ModuleContext, PageId, PageRecord, UserId,
};
use crate::error::Result;
use crate::rewrite::MediaRef;

pub use sqlite::{LogNotifier, SqliteHost, create_host_schema};

// ===========================================
// Content
// ===========================================

/// Read access to lessons and their pages.
pub trait LessonSource {
    /// Returns the lesson, or `NotFound`.
    fn lesson(&self, id: LessonId) -> Result<Lesson>;

    /// Returns where the lesson sits in the host.
    fn module_context(&self, lesson: LessonId) -> Result<ModuleContext>;

    /// Returns every page of the lesson in storage order.
    fn pages(&self, lesson: LessonId) -> Result<Vec<PageRecord>>;

    /// Returns a page's answers in their stored order.
    fn answers(&self, page: PageId) -> Result<Vec<AnswerRecord>>;

    /// Returns lessons with at least one page modified after `since`.
    fn lessons_modified_since(&self, since: DateTime<Utc>) -> Result<Vec<LessonId>>;
}

/// Options passed to the host's rich text renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RichTextOptions {
    pub context: ContextId,
    /// Skip the host's HTML cleaning pass.
    pub no_clean: bool,
    /// Wrap bare text in paragraphs.
    pub para: bool,
}

impl RichTextOptions {
    pub fn for_export(context: ContextId) -> Self {
        Self {
            context,
            no_clean: true,
            para: false,
        }
    }
}

/// Host-side HTML transformations.
pub trait ContentFormatter {
    /// Expands stored file placeholders into absolute media URLs.
    fn rewrite_media_urls(&self, html: &str, context: ContextId, page: PageId) -> String;

    /// Runs the host's rich text filters over final page HTML.
    fn render_rich_text(&self, html: &str, options: &RichTextOptions) -> String;
}

// ===========================================
// Files
// ===========================================

/// A file fetched from host storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub content: Vec<u8>,
}

/// Lookup of stored files by their full reference.
pub trait FileStore {
    fn find_file(&self, media: &MediaRef) -> Result<Option<StoredFile>>;
}

// ===========================================
// Access
// ===========================================

/// Permission and identity queries.
pub trait AccessControl {
    fn has_capability(&self, capability: &str, context: ContextId, user: UserId) -> Result<bool>;

    fn is_group_member(&self, group: GroupId, user: UserId) -> Result<bool>;

    /// Display name for a user, if the user exists.
    fn user_fullname(&self, user: UserId) -> Result<Option<String>>;
}

// ===========================================
// Messaging
// ===========================================

/// A file sent along with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub filename: String,
}

/// An outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// Delivers notifications (e-mail in a real host).
pub trait Notifier {
    fn send_notification(&self, notification: &Notification) -> Result<()>;
}

/// Everything the exporter needs from a host.
pub trait Host: LessonSource + ContentFormatter + FileStore + AccessControl + Notifier {}

impl<T> Host for T where T: LessonSource + ContentFormatter + FileStore + AccessControl + Notifier {}

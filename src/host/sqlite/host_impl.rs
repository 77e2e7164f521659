//! Host trait implementations for SqliteHost.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::warn;

use super::{SqliteHost, db};
use crate::domain::{
    AnswerRecord, AnswerRole, ContextId, GroupId, GroupMode, Lesson, LessonId, ModuleContext,
    ModuleId, PageId, PageKind, PageRecord, UserId,
};
use crate::error::{ExportError, Result};
use crate::host::{
    AccessControl, ContentFormatter, FileStore, LessonSource, Notification, Notifier,
    RichTextOptions, StoredFile,
};
use crate::rewrite::MediaRef;

/// Placeholder the host stores in place of its own file URLs.
const PLUGINFILE_PLACEHOLDER: &str = "@@PLUGINFILE@@";

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    let qtype: String = row.get(4)?;
    let kind = qtype.parse().unwrap_or_else(|err| {
        warn!(error = %err, "treating unknown page type as plain");
        PageKind::Plain
    });

    Ok(PageRecord {
        id: PageId::new(row.get(0)?),
        title: row.get(1)?,
        contents: row.get(2)?,
        kind,
        created: timestamp(row.get(5)?),
        modified: timestamp(row.get(6)?),
        modified_by: row.get::<_, Option<i64>>(3)?.map(UserId::new),
    })
}

// ===========================================
// Content
// ===========================================

impl LessonSource for SqliteHost {
    fn lesson(&self, id: LessonId) -> Result<Lesson> {
        self.conn
            .query_row(
                "SELECT name, intro FROM lessons WHERE id = ?",
                [id.get()],
                |row| {
                    Ok(Lesson {
                        id,
                        name: row.get(0)?,
                        intro: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(db)?
            .ok_or_else(|| ExportError::not_found(format!("lesson {id}")))
    }

    fn module_context(&self, lesson: LessonId) -> Result<ModuleContext> {
        self.conn
            .query_row(
                "SELECT m.id, m.context_id, l.course_id, m.group_mode
                 FROM course_modules m JOIN lessons l ON l.id = m.lesson_id
                 WHERE m.lesson_id = ?",
                [lesson.get()],
                |row| {
                    Ok(ModuleContext {
                        module_id: ModuleId::new(row.get(0)?),
                        context_id: ContextId::new(row.get(1)?),
                        course_id: row.get(2)?,
                        lesson_id: lesson,
                        group_mode: GroupMode::from_host(row.get(3)?),
                    })
                },
            )
            .optional()
            .map_err(db)?
            .ok_or_else(|| ExportError::not_found(format!("course module of lesson {lesson}")))
    }

    fn pages(&self, lesson: LessonId) -> Result<Vec<PageRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, contents, modified_by, qtype, time_created, time_modified
                 FROM lesson_pages WHERE lesson_id = ? ORDER BY id",
            )
            .map_err(db)?;
        let pages = stmt
            .query_map([lesson.get()], page_from_row)
            .map_err(db)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db)?;
        Ok(pages)
    }

    fn answers(&self, page: PageId) -> Result<Vec<AnswerRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, answer, response, role FROM lesson_answers
                 WHERE page_id = ? ORDER BY id",
            )
            .map_err(db)?;
        let answers = stmt
            .query_map([page.get()], |row| {
                let role: String = row.get(3)?;
                Ok(AnswerRecord {
                    id: row.get(0)?,
                    answer: row.get(1)?,
                    response: row.get(2)?,
                    role: if role == "response" {
                        AnswerRole::Response
                    } else {
                        AnswerRole::Answer
                    },
                })
            })
            .map_err(db)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db)?;
        Ok(answers)
    }

    fn lessons_modified_since(&self, since: DateTime<Utc>) -> Result<Vec<LessonId>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT DISTINCT lesson_id FROM lesson_pages
                 WHERE time_modified > ? ORDER BY lesson_id",
            )
            .map_err(db)?;
        let lessons = stmt
            .query_map([since.timestamp()], |row| row.get(0).map(LessonId::new))
            .map_err(db)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db)?;
        Ok(lessons)
    }
}

impl ContentFormatter for SqliteHost {
    fn rewrite_media_urls(&self, html: &str, context: ContextId, page: PageId) -> String {
        let base = format!(
            "{}/pluginfile.php/{context}/mod_lesson/page_contents/{page}",
            self.site_url
        );
        html.replace(PLUGINFILE_PLACEHOLDER, &base)
    }

    /// No filters are installed; bare text is wrapped when asked to.
    fn render_rich_text(&self, html: &str, options: &RichTextOptions) -> String {
        if options.para && !html.trim_start().starts_with('<') {
            format!("<p>{html}</p>")
        } else {
            html.to_string()
        }
    }
}

// ===========================================
// Files
// ===========================================

impl FileStore for SqliteHost {
    fn find_file(&self, media: &MediaRef) -> Result<Option<StoredFile>> {
        self.conn
            .query_row(
                "SELECT file_name, mime_type, content FROM files
                 WHERE context_id = ?1 AND component = ?2 AND file_area = ?3
                   AND item_id = ?4 AND file_path = ?5 AND file_name = ?6",
                params![
                    media.context_id.get(),
                    media.component,
                    media.file_area,
                    media.item_id,
                    media.file_path,
                    media.file_name,
                ],
                |row| {
                    Ok(StoredFile {
                        filename: row.get(0)?,
                        mime_type: row.get(1)?,
                        content: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(db)
    }
}

// ===========================================
// Access
// ===========================================

impl AccessControl for SqliteHost {
    fn has_capability(&self, capability: &str, context: ContextId, user: UserId) -> Result<bool> {
        let granted: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM user_capabilities
                 WHERE user_id = ?1 AND capability = ?2
                   AND (context_id IS NULL OR context_id = ?3)
                 LIMIT 1",
                params![user.get(), capability, context.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db)?;
        Ok(granted.is_some())
    }

    fn is_group_member(&self, group: GroupId, user: UserId) -> Result<bool> {
        let member: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group.get(), user.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db)?;
        Ok(member.is_some())
    }

    fn user_fullname(&self, user: UserId) -> Result<Option<String>> {
        let name: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT firstname, lastname FROM users WHERE id = ?",
                [user.get()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db)?;
        Ok(name.map(|(first, last)| format!("{first} {last}").trim().to_string()))
    }
}

// ===========================================
// Messaging
// ===========================================

impl Notifier for SqliteHost {
    fn send_notification(&self, notification: &Notification) -> Result<()> {
        self.notifier.send_notification(notification)
    }
}

//! Core types: Page, AnswerRecord, Lesson, LessonInfo, ExportFormat, host ids

mod format;
mod ids;
mod lesson;
mod page;

pub use format::{ExportFormat, ParseFormatError};
pub use ids::{ContextId, GroupId, LessonId, ModuleId, PageId, UserId};
pub use lesson::{DISPLAY_TIME_FORMAT, GroupMode, Lesson, LessonInfo, ModuleContext};
pub use page::{AnswerRecord, AnswerRole, Page, PageKind, PageRecord, ParsePageKindError};

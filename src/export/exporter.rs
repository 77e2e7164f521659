//! One export run, from lesson id to finished artifact.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::{
    DISPLAY_TIME_FORMAT, ExportFormat, GroupId, GroupMode, LessonId, LessonInfo, ModuleContext,
    PageId, UserId,
};
use crate::error::{ExportError, Result};
use crate::host::{Host, RichTextOptions, StoredFile};
use crate::order::PageOrderStore;
use crate::rewrite::{LinkRewriter, MediaResolver, append_answers};
use crate::store::PageOrderRepository;

use super::assembler::{Assembler, CoverSheet, DocumentAssembler, ScopedMedia};
use super::links::MANAGE_CAPABILITY;

/// Capability that lifts group separation.
pub const ALL_GROUPS_CAPABILITY: &str = "moodle/site:accessallgroups";

// ===========================================
// Request Types
// ===========================================

/// Who an export runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// An interactive user; access is checked.
    User(UserId),
    /// The scheduled sweep; no access checks.
    System,
}

impl Actor {
    pub fn user_id(&self) -> UserId {
        match self {
            Actor::User(id) => *id,
            Actor::System => UserId::SYSTEM,
        }
    }
}

/// Where the finished document goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Bytes handed back to the caller. Media is limited to the lesson's
    /// own files.
    Download,
    /// Written to the export directory.
    File,
}

/// Parameters of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub lesson: LessonId,
    pub format: ExportFormat,
    pub actor: Actor,
    pub group: Option<GroupId>,
    /// The user the export is taken for, when not the actor.
    pub on_behalf_of: Option<UserId>,
    pub delivery: Delivery,
}

impl ExportRequest {
    /// An interactive download.
    pub fn download(lesson: LessonId, format: ExportFormat, user: UserId) -> Self {
        Self {
            lesson,
            format,
            actor: Actor::User(user),
            group: None,
            on_behalf_of: None,
            delivery: Delivery::Download,
        }
    }

    /// A PDF written to disk by the scheduled sweep.
    pub fn scheduled(lesson: LessonId) -> Self {
        Self {
            lesson,
            format: ExportFormat::Pdf,
            actor: Actor::System,
            group: None,
            on_behalf_of: None,
            delivery: Delivery::File,
        }
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Download {
        filename: String,
        mime_type: &'static str,
        bytes: Vec<u8>,
    },
    File {
        path: PathBuf,
        filename: String,
    },
}

impl Artifact {
    pub fn filename(&self) -> &str {
        match self {
            Artifact::Download { filename, .. } | Artifact::File { filename, .. } => filename,
        }
    }
}

/// `<title> <YYYY-MM-DD HH:MM>.<ext>` without path separators or control
/// characters.
pub fn artifact_filename(title: &str, at: DateTime<Utc>, format: ExportFormat) -> String {
    let raw = format!("{} {}", title.trim(), at.format(DISPLAY_TIME_FORMAT));
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\'))
        .collect();
    format!("{}.{}", cleaned.trim(), format.extension())
}

// ===========================================
// Exporter
// ===========================================

/// Runs exports against a host.
pub struct LessonExporter<'a, H: Host + ?Sized> {
    host: &'a H,
    config: &'a Config,
}

impl<'a, H: Host + ?Sized> LessonExporter<'a, H> {
    pub fn new(host: &'a H, config: &'a Config) -> Self {
        Self { host, config }
    }

    fn require(&self, capability: &str, module: &ModuleContext, user: UserId) -> Result<()> {
        if self.host.has_capability(capability, module.context_id, user)? {
            Ok(())
        } else {
            Err(ExportError::denied(format!("user {user} lacks {capability}")))
        }
    }

    /// Checks that the request's actor may run it.
    ///
    /// Besides the format's export capability: a group outside the user's
    /// own under separate groups needs the manage or all-groups capability,
    /// and exporting for someone else needs the manage capability unless
    /// groups are visible.
    pub fn check_access(&self, module: &ModuleContext, request: &ExportRequest) -> Result<()> {
        let Actor::User(user) = request.actor else {
            return Ok(());
        };
        self.require(&request.format.capability(), module, user)?;

        if let Some(group) = request.group
            && module.group_mode == GroupMode::Separate
            && !self.host.is_group_member(group, user)?
            && !self.host.has_capability(MANAGE_CAPABILITY, module.context_id, user)?
        {
            self.require(ALL_GROUPS_CAPABILITY, module, user)?;
        }

        if let Some(other) = request.on_behalf_of
            && other != user
            && module.group_mode != GroupMode::Visible
        {
            self.require(MANAGE_CAPABILITY, module, user)?;
        }
        Ok(())
    }

    /// Exports one lesson.
    pub fn export<R: PageOrderRepository + ?Sized>(
        &self,
        store: &mut R,
        request: &ExportRequest,
    ) -> Result<Artifact> {
        let started = Instant::now();
        let budget = Duration::from_secs(self.config.time_budget_secs);
        let within_budget = || {
            if started.elapsed() >= budget {
                Err(ExportError::TimeBudgetExceeded {
                    budget_secs: self.config.time_budget_secs,
                })
            } else {
                Ok(())
            }
        };

        let lesson = self.host.lesson(request.lesson)?;
        let module = self.host.module_context(request.lesson)?;
        self.check_access(&module, request)?;
        info!(lesson = %lesson.id, format = %request.format, "exporting lesson");

        let pages = PageOrderStore::load(store, self.host, lesson.id)?.into_pages();
        let now = Utc::now();

        let mut info = LessonInfo::new(now);
        for page in &pages {
            info.record(page, request.actor.user_id());
        }
        let author = match info.modified_by() {
            Some(user) => self.host.user_fullname(user)?,
            None => None,
        };
        if let Some(name) = &author {
            info.set_modified_by_name(name.as_str());
        }

        let options = RichTextOptions::for_export(module.context_id);
        let cover = CoverSheet {
            title: lesson.name.clone(),
            description_html: self.host.render_rich_text(&lesson.intro, &options),
            info_lines: info.lines(),
            author,
            logo: self.cover_logo()?,
        };

        let restrict_to = (request.delivery == Delivery::Download).then_some(module.context_id);
        let media = ScopedMedia::new(
            MediaResolver::new(self.host, self.config.site_root()),
            restrict_to,
        );
        let mut assembler = Assembler::open(request.format, &lesson.name, self.config, &media)?;
        assembler.emit_cover(&cover)?;

        let known: HashSet<PageId> = pages.iter().map(|p| p.id).collect();
        let rewriter = LinkRewriter::new(self.config.site_root(), &known, request.format);
        for mut page in pages {
            within_budget()?;

            let expanded = self
                .host
                .rewrite_media_urls(&page.contents, module.context_id, page.id);
            let rewrite = rewriter.rewrite(&expanded, page.id);
            debug!(
                page = %page.id,
                anchors = rewrite.anchors,
                cross_page = rewrite.cross_page,
                removed = rewrite.removed,
                "rewrote links"
            );
            page.contents = rewrite.content;

            if page.kind.is_question() {
                page.answers = self.host.answers(page.id)?;
                append_answers(&mut page);
            }
            page.contents = self.host.render_rich_text(&page.contents, &options);
            assembler.emit_page(&page)?;
        }

        within_budget()?;
        let bytes = assembler.finalize()?;
        let filename = artifact_filename(&lesson.name, now, request.format);
        info!(
            lesson = %lesson.id,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "export finished"
        );

        match request.delivery {
            Delivery::Download => Ok(Artifact::Download {
                filename,
                mime_type: request.format.mime_type(),
                bytes,
            }),
            Delivery::File => {
                let filename = filename.replace(' ', "_");
                let path = self.write_file(&filename, &bytes)?;
                Ok(Artifact::File { path, filename })
            }
        }
    }

    fn cover_logo(&self) -> Result<Option<StoredFile>> {
        let Some(path) = &self.config.cover_logo else {
            return Ok(None);
        };
        let content = std::fs::read(path).map_err(|e| ExportError::io(path, e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "logo".to_string());
        Ok(Some(StoredFile {
            filename,
            mime_type: None,
            content,
        }))
    }

    fn write_file(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.config.export_dir();
        std::fs::create_dir_all(&dir).map_err(|e| ExportError::io(&dir, e))?;
        let path = Path::new(&dir).join(filename);
        std::fs::write(&path, bytes).map_err(|e| ExportError::io(&path, e))?;
        debug!(path = %path.display(), "wrote export file");
        Ok(path)
    }
}

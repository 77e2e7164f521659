//! The document assembler seam shared by every output format.

use serde::Serialize;

use crate::config::Config;
use crate::domain::{ContextId, ExportFormat, Page};
use crate::error::{ExportError, Result};
use crate::host::{FileStore, StoredFile};
use crate::rewrite::MediaResolver;

use super::epub::EpubAssembler;
use super::pdf::PdfAssembler;

// ===========================================
// Cover Sheet
// ===========================================

/// Everything printed on the first page of an export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverSheet {
    pub title: String,
    /// Rendered intro HTML.
    pub description_html: String,
    /// "Last modified by ..." and "Exported at ..." lines.
    pub info_lines: Vec<String>,
    /// Display name of the last modifier, used as the document author.
    pub author: Option<String>,
    #[serde(skip)]
    pub logo: Option<StoredFile>,
}

// ===========================================
// Media
// ===========================================

/// Binary lookup for images met while assembling.
pub trait MediaSource {
    fn fetch(&self, url: &str) -> Result<StoredFile>;
}

/// A [`MediaResolver`] bound to one export's context restriction.
pub struct ScopedMedia<'a, S: FileStore + ?Sized> {
    resolver: MediaResolver<'a, S>,
    restrict_to: Option<ContextId>,
}

impl<'a, S: FileStore + ?Sized> ScopedMedia<'a, S> {
    pub fn new(resolver: MediaResolver<'a, S>, restrict_to: Option<ContextId>) -> Self {
        Self {
            resolver,
            restrict_to,
        }
    }
}

impl<S: FileStore + ?Sized> MediaSource for ScopedMedia<'_, S> {
    fn fetch(&self, url: &str) -> Result<StoredFile> {
        self.resolver.resolve(url, self.restrict_to)
    }
}

// ===========================================
// Assembly State
// ===========================================

/// Where an assembler is in its lifecycle.
///
/// `Opened -> CoverEmitted -> PageEmitted* -> Finalized`. Steps cannot be
/// skipped and nothing follows `Finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Opened,
    CoverEmitted,
    PageEmitted,
    Finalized,
}

/// A call that moves the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStep {
    Cover,
    Page,
    Finalize,
}

impl AssemblyStep {
    fn verb(&self) -> &'static str {
        match self {
            AssemblyStep::Cover => "emit a cover for",
            AssemblyStep::Page => "emit a page into",
            AssemblyStep::Finalize => "finalize",
        }
    }
}

impl AssemblyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyState::Opened => "opened",
            AssemblyState::CoverEmitted => "past its cover",
            AssemblyState::PageEmitted => "emitting pages",
            AssemblyState::Finalized => "finalized",
        }
    }

    /// Applies a step, or fails without changing state.
    pub fn advance(&mut self, step: AssemblyStep) -> Result<()> {
        use AssemblyState::*;

        let next = match (*self, step) {
            (Opened, AssemblyStep::Cover) => CoverEmitted,
            (CoverEmitted | PageEmitted, AssemblyStep::Page) => PageEmitted,
            (CoverEmitted | PageEmitted, AssemblyStep::Finalize) => Finalized,
            (state, step) => {
                return Err(ExportError::AssemblerState {
                    attempted: step.verb(),
                    state: state.as_str(),
                });
            }
        };
        *self = next;
        Ok(())
    }
}

// ===========================================
// Assembler Trait
// ===========================================

/// Streams a lesson into one output document.
pub trait DocumentAssembler {
    fn state(&self) -> AssemblyState;

    fn emit_cover(&mut self, cover: &CoverSheet) -> Result<()>;

    /// Emits one page: its destination, a title heading, then its contents.
    fn emit_page(&mut self, page: &Page) -> Result<()>;

    /// Closes the document and returns its bytes.
    fn finalize(&mut self) -> Result<Vec<u8>>;
}

/// The closed set of output formats.
pub enum Assembler<'a> {
    Paginated(PdfAssembler<'a>),
    Reflowable(EpubAssembler<'a>),
}

impl<'a> Assembler<'a> {
    /// Opens an empty document for `format`.
    pub fn open(
        format: ExportFormat,
        title: &str,
        config: &'a Config,
        media: &'a dyn MediaSource,
    ) -> Result<Self> {
        Ok(match format {
            ExportFormat::Pdf => Assembler::Paginated(PdfAssembler::new(title, config, media)?),
            ExportFormat::Epub => Assembler::Reflowable(EpubAssembler::new(title, config, media)?),
        })
    }

    fn inner(&mut self) -> &mut dyn DocumentAssembler {
        match self {
            Assembler::Paginated(pdf) => pdf,
            Assembler::Reflowable(epub) => epub,
        }
    }
}

impl DocumentAssembler for Assembler<'_> {
    fn state(&self) -> AssemblyState {
        match self {
            Assembler::Paginated(pdf) => pdf.state(),
            Assembler::Reflowable(epub) => epub.state(),
        }
    }

    fn emit_cover(&mut self, cover: &CoverSheet) -> Result<()> {
        self.inner().emit_cover(cover)
    }

    fn emit_page(&mut self, page: &Page) -> Result<()> {
        self.inner().emit_page(page)
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        self.inner().finalize()
    }
}

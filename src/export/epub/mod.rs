//! Reflowable output: an EPUB 3 package with one XHTML file per page.

mod xhtml;

use std::collections::HashMap;

use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ReferenceType, ZipLibrary};
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{ExportFormat, Page};
use crate::error::{ExportError, Result};
use crate::host::StoredFile;
use crate::rewrite::page_target;

use super::assembler::{AssemblyState, AssemblyStep, CoverSheet, DocumentAssembler, MediaSource};
use super::template;

use xhtml::{plain_text, to_xhtml};

const COVER_HREF: &str = "cover.xhtml";

/// A file stored in the package next to the XHTML documents.
#[derive(Debug, Clone)]
struct Resource {
    path: String,
    mime: String,
    content: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Chapter {
    href: String,
    title: String,
    xhtml: String,
}

/// Picks the media type of an image from its name, then from what the
/// host declared.
fn image_type(file: &StoredFile) -> Option<(&'static str, &'static str)> {
    let ext = file
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let by_ext = match ext.as_deref() {
        Some("png") => Some(("png", "image/png")),
        Some("jpg" | "jpeg") => Some(("jpg", "image/jpeg")),
        Some("gif") => Some(("gif", "image/gif")),
        Some("svg") => Some(("svg", "image/svg+xml")),
        Some("webp") => Some(("webp", "image/webp")),
        _ => None,
    };
    by_ext.or_else(|| match file.mime_type.as_deref() {
        Some("image/png") => Some(("png", "image/png")),
        Some("image/jpeg") => Some(("jpg", "image/jpeg")),
        Some("image/gif") => Some(("gif", "image/gif")),
        Some("image/svg+xml") => Some(("svg", "image/svg+xml")),
        Some("image/webp") => Some(("webp", "image/webp")),
        _ => None,
    })
}

/// Collects XHTML documents and images, then packages them on finalize.
pub struct EpubAssembler<'a> {
    title: String,
    config: &'a Config,
    media: &'a dyn MediaSource,
    accent: (u8, u8, u8),
    state: AssemblyState,
    author: Option<String>,
    description: Option<String>,
    cover: Option<String>,
    cover_image: Option<Resource>,
    chapters: Vec<Chapter>,
    resources: Vec<Resource>,
    /// Source URL to package path, so repeated images are stored once.
    embedded: HashMap<String, String>,
}

impl<'a> EpubAssembler<'a> {
    pub fn new(title: &str, config: &'a Config, media: &'a dyn MediaSource) -> Result<Self> {
        Ok(Self {
            title: title.to_string(),
            config,
            media,
            accent: config.accent_rgb()?,
            state: AssemblyState::Opened,
            author: None,
            description: None,
            cover: None,
            cover_image: None,
            chapters: Vec::new(),
            resources: Vec::new(),
            embedded: HashMap::new(),
        })
    }

    /// Stores the image behind `src` in the package and returns its path.
    /// Images that cannot be fetched keep their original source.
    fn embed(&mut self, src: &str) -> Option<String> {
        if let Some(path) = self.embedded.get(src) {
            return Some(path.clone());
        }
        let file = match self.media.fetch(src) {
            Ok(file) => file,
            Err(err) => {
                warn!(url = src, error = %err, "image left unembedded");
                return None;
            }
        };
        let Some((ext, mime)) = image_type(&file) else {
            warn!(url = src, file = %file.filename, "not an image type EPUB readers support");
            return None;
        };

        let path = format!("images/img-{}.{ext}", self.resources.len() + 1);
        self.resources.push(Resource {
            path: path.clone(),
            mime: mime.to_string(),
            content: file.content,
        });
        self.embedded.insert(src.to_string(), path.clone());
        Some(path)
    }

    fn package(&self) -> epub_builder::Result<Vec<u8>> {
        let mut builder = EpubBuilder::new(ZipLibrary::new()?)?;
        builder.epub_version(EpubVersion::V30);
        builder
            .metadata("title", self.title.as_str())?
            .metadata("lang", self.config.language.as_str())?
            .metadata("generator", "lessonexport")?;
        if let Some(author) = &self.author {
            builder.metadata("author", author.as_str())?;
        }
        if let Some(description) = &self.description {
            builder.metadata("description", description.as_str())?;
        }
        builder.stylesheet(template::stylesheet(self.config.custom_style.as_deref()).as_bytes())?;

        if let Some(logo) = &self.cover_image {
            builder.add_cover_image(&logo.path, logo.content.as_slice(), logo.mime.as_str())?;
        }
        for resource in &self.resources {
            builder.add_resource(&resource.path, resource.content.as_slice(), resource.mime.as_str())?;
        }

        if let Some(cover) = &self.cover {
            builder.add_content(
                EpubContent::new(COVER_HREF, cover.as_bytes())
                    .title(self.title.as_str())
                    .reftype(ReferenceType::Cover),
            )?;
        }
        for chapter in &self.chapters {
            builder.add_content(
                EpubContent::new(chapter.href.as_str(), chapter.xhtml.as_bytes())
                    .title(chapter.title.as_str())
                    .reftype(ReferenceType::Text),
            )?;
        }

        let mut bytes = Vec::new();
        builder.generate(&mut bytes)?;
        Ok(bytes)
    }
}

impl DocumentAssembler for EpubAssembler<'_> {
    fn state(&self) -> AssemblyState {
        self.state
    }

    fn emit_cover(&mut self, sheet: &CoverSheet) -> Result<()> {
        self.state.advance(AssemblyStep::Cover)?;

        let logo_path = sheet.logo.as_ref().and_then(|logo| {
            let Some((ext, mime)) = image_type(logo) else {
                warn!(file = %logo.filename, "cover logo is not a supported image");
                return None;
            };
            let path = format!("images/cover-logo.{ext}");
            self.cover_image = Some(Resource {
                path: path.clone(),
                mime: mime.to_string(),
                content: logo.content.clone(),
            });
            Some(path)
        });

        let description_html = to_xhtml(&sheet.description_html, |src| self.embed(src));
        let description = plain_text(&sheet.description_html);
        self.description = (!description.is_empty()).then_some(description);
        self.author = sheet.author.clone().filter(|a| !a.trim().is_empty());

        let cover = CoverSheet {
            description_html,
            ..sheet.clone()
        };
        self.cover = Some(template::render_cover(
            &cover,
            self.accent,
            logo_path.as_deref(),
            &self.config.language,
        )?);
        Ok(())
    }

    fn emit_page(&mut self, page: &Page) -> Result<()> {
        self.state.advance(AssemblyStep::Page)?;

        let body = to_xhtml(&page.contents, |src| self.embed(src));
        let xhtml = template::render_page(
            &page.title,
            &page.destination(),
            &body,
            &self.config.language,
        )?;
        let href = page_target(page.id, ExportFormat::Epub);
        debug!(page = %page.id, href = %href, "added EPUB chapter");
        self.chapters.push(Chapter {
            href,
            title: page.title.clone(),
            xhtml,
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        self.state.advance(AssemblyStep::Finalize)?;
        self.package().map_err(ExportError::epub)
    }
}

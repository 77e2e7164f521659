//! Paginated output: A4 pages drawn with the standard PDF fonts.

mod canvas;
mod image;
mod layout;
mod metrics;
mod protect;

use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::Page;
use crate::error::Result;

use super::assembler::{AssemblyState, AssemblyStep, CoverSheet, DocumentAssembler, MediaSource};

use canvas::{Canvas, MM, Rgb};
use layout::{BODY_SIZE, Flow, Frame, PageDecor};
use metrics::FontFamily;
use protect::Protection;

/// Cover geometry, in millimetres from the top-left corner.
mod cover {
    pub const BORDER: (f32, f32, f32, f32) = (9.0, 9.0, 192.0, 279.0);
    pub const BORDER_RADIUS: f32 = 6.5;
    pub const LOGO: (f32, f32, f32, f32) = (52.0, 27.0, 103.0, 36.0);
    /// Thin rule, banner, thin rule.
    pub const BANDS: [(f32, f32); 3] = [(87.5, 2.5), (90.0, 30.0), (120.0, 2.5)];
    pub const TITLE_TOP: f32 = 100.0;
    pub const TITLE_SIZE: f32 = 20.0;
    pub const DESCRIPTION: (f32, f32, f32, f32) = (30.0, 130.0, 140.0, 40.0);
    pub const INFO: (f32, f32, f32, f32) = (12.0, 255.0, 176.0, 20.0);
}

const PAGE_TITLE_SIZE: f32 = 16.0;

fn darken((r, g, b): Rgb) -> Rgb {
    let shade = |c: u8| (f32::from(c) * 0.7) as u8;
    (shade(r), shade(g), shade(b))
}

/// Builds a PDF one page at a time.
pub struct PdfAssembler<'a> {
    canvas: Canvas,
    media: &'a dyn MediaSource,
    decor: PageDecor,
    accent: Rgb,
    protection: Option<Protection>,
    title: String,
    state: AssemblyState,
}

impl<'a> PdfAssembler<'a> {
    pub fn new(title: &str, config: &'a Config, media: &'a dyn MediaSource) -> Result<Self> {
        let family = FontFamily::from_config(config.custom_font.as_deref());
        Ok(Self {
            canvas: Canvas::new(family),
            media,
            decor: PageDecor::new(
                config.header_watermark.as_deref(),
                config.footer_watermark.as_deref(),
            ),
            accent: config.accent_rgb()?,
            protection: Protection::from_config(config),
            title: title.to_string(),
            state: AssemblyState::Opened,
        })
    }

    fn draw_logo(&mut self, data: &[u8]) {
        let decoded = match image::decode(data) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, "cover logo cannot be embedded");
                return;
            }
        };
        let (x, top, width, height) = cover::LOGO;
        let (box_w, box_h) = (width * MM, height * MM);
        let aspect = decoded.width as f32 / (decoded.height.max(1)) as f32;
        let (w, h) = if box_w / box_h > aspect {
            (box_h * aspect, box_h)
        } else {
            (box_w, box_w / aspect)
        };
        let handle = self.canvas.add_image(decoded);
        let left = x * MM + (box_w - w) / 2.0;
        let upper = top * MM + (box_h - h) / 2.0;
        self.canvas.draw_image(&handle, left, upper, w, h);
    }
}

impl DocumentAssembler for PdfAssembler<'_> {
    fn state(&self) -> AssemblyState {
        self.state
    }

    fn emit_cover(&mut self, sheet: &CoverSheet) -> Result<()> {
        self.state.advance(AssemblyStep::Cover)?;
        self.canvas.add_page();

        let (x, top, width, height) = cover::BORDER;
        self.canvas
            .stroke_rounded_rect(x * MM, top * MM, width * MM, height * MM, cover::BORDER_RADIUS * MM);

        if let Some(logo) = &sheet.logo {
            self.draw_logo(&logo.content);
        }

        for (i, (band_top, band_height)) in cover::BANDS.iter().enumerate() {
            let color = if i == 1 { self.accent } else { darken(self.accent) };
            self.canvas
                .fill_rect(x * MM, band_top * MM, width * MM, band_height * MM, color);
        }

        let media = self.media;
        let no_decor = PageDecor::default();

        let title_frame = Frame::fixed(
            (x + 5.0) * MM,
            cover::TITLE_TOP * MM,
            (width - 10.0) * MM,
            20.0 * MM,
        )
        .centered();
        Flow::new(&mut self.canvas, media, &no_decor, title_frame)
            .heading(&sheet.title, cover::TITLE_SIZE);

        let (x, top, width, height) = cover::DESCRIPTION;
        let frame = Frame::fixed(x * MM, top * MM, width * MM, height * MM);
        Flow::new(&mut self.canvas, media, &no_decor, frame).html(&sheet.description_html);

        let (x, top, width, height) = cover::INFO;
        let frame = Frame::fixed(x * MM, top * MM, width * MM, height * MM);
        let mut info = Flow::new(&mut self.canvas, media, &no_decor, frame);
        for line in &sheet.info_lines {
            info.paragraph(line, BODY_SIZE);
        }
        Ok(())
    }

    fn emit_page(&mut self, page: &Page) -> Result<()> {
        self.state.advance(AssemblyStep::Page)?;
        let media = self.media;
        let mut flow = Flow::new(&mut self.canvas, media, &self.decor, Frame::content());
        flow.new_page();
        flow.destination(&page.destination());
        flow.heading(&page.title, PAGE_TITLE_SIZE);
        flow.html(&page.contents);
        debug!(page = %page.id, pages = self.canvas.page_count(), "laid out page");
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        self.state.advance(AssemblyStep::Finalize)?;
        let canvas = std::mem::replace(&mut self.canvas, Canvas::new(FontFamily::Helvetica));
        let mut doc = canvas.finish(&self.title)?;
        doc.compress();
        if let Some(protection) = &self.protection {
            protection.apply(&mut doc);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(lopdf::Error::from)?;
        Ok(bytes)
    }
}

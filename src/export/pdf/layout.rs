//! Flows page HTML onto the canvas.
//!
//! The walker understands the handful of elements lesson pages actually use:
//! paragraphs and other blocks, headings, lists, line breaks, rules, emphasis,
//! links, anchors and images. Everything else is treated as an inline
//! container so its text still comes out.

use scraper::{ElementRef, Html, Node};
use tracing::warn;

use crate::export::assembler::MediaSource;

use super::canvas::{BLACK, Canvas, LinkTarget, MM, PAGE_HEIGHT, Rgb, encode_win_ansi};
use super::image;
use super::metrics::FontStyle;

pub const BODY_SIZE: f32 = 12.0;
const LINE_FACTOR: f32 = 1.3;
const LIST_INDENT: f32 = 18.0;
/// Images carry pixel sizes; pages are laid out at 96 dpi.
const PX_TO_PT: f32 = 0.75;

const TEXT_COLOR: Rgb = BLACK;
const LINK_COLOR: Rgb = (0, 0, 200);
const DECOR_COLOR: Rgb = (128, 128, 128);

/// Horizontal placement of finished lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// The box text flows into, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    /// Overflow starts a new page; otherwise it is clipped.
    pub paged: bool,
    pub align: Align,
}

impl Frame {
    /// The content area of a regular page.
    pub fn content() -> Self {
        Self {
            left: 20.0 * MM,
            right: 190.0 * MM,
            top: 10.0 * MM,
            bottom: PAGE_HEIGHT - 20.0 * MM,
            paged: true,
            align: Align::Left,
        }
    }

    /// A fixed box that clips whatever does not fit.
    pub fn fixed(x: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left: x,
            right: x + width,
            top,
            bottom: top + height,
            paged: false,
            align: Align::Left,
        }
    }

    pub fn centered(self) -> Self {
        Self {
            align: Align::Center,
            ..self
        }
    }
}

/// Watermark text repeated on every content page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDecor {
    header: Option<Vec<u8>>,
    footer: Option<Vec<u8>>,
}

impl PageDecor {
    pub fn new(header: Option<&str>, footer: Option<&str>) -> Self {
        let encode = |text: Option<&str>| {
            text.map(str::trim)
                .filter(|t| !t.is_empty())
                .map(encode_win_ansi)
        };
        Self {
            header: encode(header),
            footer: encode(footer),
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        if let Some(header) = &self.header {
            canvas.text(20.0 * MM, 4.0 * MM, FontStyle::REGULAR, 8.0, DECOR_COLOR, header);
        }
        if let Some(footer) = &self.footer {
            let top = PAGE_HEIGHT - 12.0 * MM;
            canvas.text(20.0 * MM, top, FontStyle::REGULAR, 8.0, DECOR_COLOR, footer);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Style {
    font: FontStyle,
    size: f32,
}

impl Style {
    fn body() -> Self {
        Self {
            font: FontStyle::REGULAR,
            size: BODY_SIZE,
        }
    }

    fn bold(self) -> Self {
        Self {
            font: FontStyle {
                bold: true,
                ..self.font
            },
            ..self
        }
    }

    fn italic(self) -> Self {
        Self {
            font: FontStyle {
                italic: true,
                ..self.font
            },
            ..self
        }
    }
}

#[derive(Debug, Clone)]
struct Word {
    bytes: Vec<u8>,
    style: Style,
    width: f32,
    gap: f32,
    link: Option<LinkTarget>,
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 20.0,
        2 => 16.0,
        3 => 14.0,
        4 => 12.0,
        5 => 11.0,
        _ => 10.0,
    }
}

/// Turns an `href` into a link target. Relative links have nowhere to go
/// in a standalone document and are dropped.
fn link_target(href: &str) -> Option<LinkTarget> {
    let href = href.trim();
    if let Some(name) = href.strip_prefix('#') {
        return (!name.is_empty()).then(|| LinkTarget::Destination(name.to_string()));
    }
    let lower = href.to_ascii_lowercase();
    ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
        .then(|| LinkTarget::Uri(href.to_string()))
}

// ===========================================
// Flow
// ===========================================

/// A cursor that lays out words and images into a [`Frame`].
pub struct Flow<'a> {
    canvas: &'a mut Canvas,
    media: &'a dyn MediaSource,
    decor: &'a PageDecor,
    frame: Frame,
    y: f32,
    indent: f32,
    line: Vec<Word>,
    line_width: f32,
    pending_space: bool,
    /// One entry per open list: the next number, or `None` for bullets.
    lists: Vec<Option<u32>>,
}

impl<'a> Flow<'a> {
    pub fn new(
        canvas: &'a mut Canvas,
        media: &'a dyn MediaSource,
        decor: &'a PageDecor,
        frame: Frame,
    ) -> Self {
        Self {
            canvas,
            media,
            decor,
            y: frame.top,
            frame,
            indent: 0.0,
            line: Vec::new(),
            line_width: 0.0,
            pending_space: false,
            lists: Vec::new(),
        }
    }

    /// Starts a fresh page with its watermarks.
    pub fn new_page(&mut self) {
        self.canvas.add_page();
        self.decor.draw(self.canvas);
        self.y = self.frame.top;
    }

    /// Registers a named destination at the cursor.
    pub fn destination(&mut self, name: &str) {
        self.canvas.destination(name, self.y);
    }

    /// Writes a bold heading on its own lines.
    pub fn heading(&mut self, text: &str, size: f32) {
        self.block_gap(size * 0.5);
        let style = Style {
            font: FontStyle::BOLD,
            size,
        };
        self.text(text, style, None);
        self.flush_line();
        self.y += size * 0.5;
    }

    /// Writes plain text as one paragraph.
    pub fn paragraph(&mut self, text: &str, size: f32) {
        let style = Style {
            font: FontStyle::REGULAR,
            size,
        };
        self.text(text, style, None);
        self.flush_line();
    }

    /// Lays out an HTML fragment.
    pub fn html(&mut self, html: &str) {
        let fragment = Html::parse_fragment(html);
        self.walk(fragment.root_element(), Style::body(), None);
        self.flush_line();
    }

    fn walk(&mut self, el: ElementRef<'_>, style: Style, link: Option<&LinkTarget>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => self.text(text, style, link),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child, style, link);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>, style: Style, link: Option<&LinkTarget>) {
        if let Some(name) = el.value().attr("name").filter(|n| !n.is_empty()) {
            self.canvas.destination(name, self.y);
        }
        if let Some(id) = el.value().attr("id").filter(|n| !n.is_empty()) {
            self.canvas.destination(id, self.y);
        }

        let tag = el.value().name();
        match tag {
            "script" | "style" | "head" | "title" | "noscript" | "template" => {}
            "br" => self.line_break(style),
            "hr" => {
                self.flush_line();
                if self.ensure_space(8.0) {
                    let width = self.frame.right - self.frame.left - self.indent;
                    let x = self.frame.left + self.indent;
                    self.canvas.rule(x, self.y + 3.5, width, 0.5, DECOR_COLOR);
                    self.y += 8.0;
                }
            }
            "img" => self.image(el),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag.as_bytes()[1] - b'0';
                let size = heading_size(level);
                self.block_gap(size * 0.5);
                self.walk(el, Style { size, ..style }.bold(), link);
                self.flush_line();
                self.y += size * 0.3;
            }
            "p" => {
                self.flush_line();
                self.walk(el, style, link);
                self.flush_line();
                self.block_gap(style.size * 0.5);
            }
            "div" | "section" | "article" | "header" | "footer" | "blockquote" | "table"
            | "tbody" | "thead" | "tr" | "figure" | "figcaption" | "pre" | "center" | "dl"
            | "dt" | "dd" => {
                self.flush_line();
                self.walk(el, style, link);
                self.flush_line();
            }
            "ul" | "ol" => {
                self.flush_line();
                self.lists.push((tag == "ol").then_some(1));
                self.indent += LIST_INDENT;
                self.walk(el, style, link);
                self.flush_line();
                self.indent -= LIST_INDENT;
                self.lists.pop();
                self.block_gap(style.size * 0.3);
            }
            "li" => {
                self.flush_line();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    _ => "\u{2022}".to_string(),
                };
                self.push_word(&marker, style, None);
                self.pending_space = true;
                self.walk(el, style, link);
                self.flush_line();
            }
            "b" | "strong" | "th" => {
                self.walk(el, style.bold(), link);
                if tag == "th" {
                    self.pending_space = true;
                }
            }
            "i" | "em" | "cite" | "var" => self.walk(el, style.italic(), link),
            "td" => {
                self.walk(el, style, link);
                self.pending_space = true;
            }
            "a" => {
                let target = el.value().attr("href").and_then(link_target);
                self.walk(el, style, target.as_ref().or(link));
            }
            _ => self.walk(el, style, link),
        }
    }

    fn text(&mut self, text: &str, style: Style, link: Option<&LinkTarget>) {
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        let mut any = false;
        for word in text.split_whitespace() {
            if any {
                self.pending_space = true;
            }
            self.push_word(word, style, link);
            any = true;
        }
        if any && text.ends_with(char::is_whitespace) {
            self.pending_space = true;
        }
    }

    fn available_width(&self) -> f32 {
        self.frame.right - self.frame.left - self.indent
    }

    fn push_word(&mut self, word: &str, style: Style, link: Option<&LinkTarget>) {
        let bytes = encode_win_ansi(word);
        let avail = self.available_width();
        let mut gap = if self.pending_space && !self.line.is_empty() {
            self.canvas.text_width(b" ", style.font, style.size)
        } else {
            0.0
        };
        self.pending_space = false;

        let mut rest: &[u8] = &bytes;
        let width_of = |canvas: &Canvas, bytes: &[u8]| canvas.text_width(bytes, style.font, style.size);

        // Words wider than the frame are broken wherever they overflow.
        while rest.len() > 1 && width_of(&*self.canvas, rest) > avail {
            let mut cut = rest.len() - 1;
            while cut > 1 && width_of(&*self.canvas, &rest[..cut]) > avail {
                cut -= 1;
            }
            self.flush_line();
            self.place(rest[..cut].to_vec(), style, 0.0, link);
            self.flush_line();
            rest = &rest[cut..];
            gap = 0.0;
        }

        let width = width_of(&*self.canvas, rest);
        if !self.line.is_empty() && self.line_width + gap + width > avail {
            self.flush_line();
            gap = 0.0;
        }
        self.place(rest.to_vec(), style, gap, link);
    }

    fn place(&mut self, bytes: Vec<u8>, style: Style, gap: f32, link: Option<&LinkTarget>) {
        let width = self.canvas.text_width(&bytes, style.font, style.size);
        self.line_width += gap + width;
        self.line.push(Word {
            bytes,
            style,
            width,
            gap,
            link: link.cloned(),
        });
    }

    fn flush_line(&mut self) {
        if self.line.is_empty() {
            return;
        }
        let words = std::mem::take(&mut self.line);
        let line_width = std::mem::replace(&mut self.line_width, 0.0);
        let height = words
            .iter()
            .map(|w| w.style.size)
            .fold(0.0f32, f32::max)
            * LINE_FACTOR;
        if !self.ensure_space(height) {
            return;
        }

        let mut x = self.frame.left + self.indent;
        if self.frame.align == Align::Center {
            x += ((self.available_width() - line_width) / 2.0).max(0.0);
        }
        for word in words {
            x += word.gap;
            let color = if word.link.is_some() { LINK_COLOR } else { TEXT_COLOR };
            self.canvas
                .text(x, self.y, word.style.font, word.style.size, color, &word.bytes);
            if let Some(target) = word.link {
                self.canvas.link(x, self.y, word.width, word.style.size, target);
            }
            x += word.width;
        }
        self.y += height;
    }

    fn line_break(&mut self, style: Style) {
        if self.line.is_empty() {
            let height = style.size * LINE_FACTOR;
            if self.ensure_space(height) {
                self.y += height;
            }
        } else {
            self.flush_line();
        }
        self.pending_space = false;
    }

    /// Adds vertical space unless the cursor sits at the top of the frame.
    fn block_gap(&mut self, gap: f32) {
        self.flush_line();
        if self.y > self.frame.top {
            self.y = (self.y + gap).min(self.frame.bottom);
        }
    }

    /// Makes room for `height`. Returns false when a fixed frame is full.
    fn ensure_space(&mut self, height: f32) -> bool {
        if self.y + height <= self.frame.bottom {
            return true;
        }
        if !self.frame.paged {
            return false;
        }
        if self.y > self.frame.top {
            self.new_page();
        }
        true
    }

    fn image(&mut self, el: ElementRef<'_>) {
        self.flush_line();
        let Some(src) = el.value().attr("src").filter(|s| !s.trim().is_empty()) else {
            return;
        };
        let label = el
            .value()
            .attr("alt")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .unwrap_or_else(|| src.rsplit('/').next().unwrap_or(src))
            .to_string();

        let file = match self.media.fetch(src) {
            Ok(file) => file,
            Err(err) => {
                warn!(url = src, error = %err, "image left out of PDF");
                self.placeholder(&label);
                return;
            }
        };
        let decoded = match image::decode(&file.content) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(url = src, error = %err, "image cannot be embedded");
                self.placeholder(&label);
                return;
            }
        };

        let attr_px = |name: &str| {
            el.value()
                .attr(name)
                .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
                .filter(|v| *v > 0.0)
        };
        let (px_w, px_h) = (decoded.width as f32, decoded.height as f32);
        let (mut width, mut height) = match (attr_px("width"), attr_px("height")) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w * px_h / px_w.max(1.0)),
            (None, Some(h)) => (h * px_w / px_h.max(1.0), h),
            (None, None) => (px_w, px_h),
        };
        width *= PX_TO_PT;
        height *= PX_TO_PT;

        let max_width = self.available_width();
        let max_height = self.frame.bottom - self.frame.top;
        let scale = (max_width / width).min(max_height / height).min(1.0);
        width *= scale;
        height *= scale;

        let handle = self.canvas.add_image(decoded);
        if !self.ensure_space(height) {
            return;
        }
        let x = self.frame.left + self.indent;
        self.canvas.draw_image(&handle, x, self.y, width, height);
        self.y += height + 4.0;
    }

    fn placeholder(&mut self, label: &str) {
        let style = Style::body().italic();
        self.text(&format!("[image unavailable: {label}]"), style, None);
        self.flush_line();
    }
}

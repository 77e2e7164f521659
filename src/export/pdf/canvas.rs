//! Page buffers over the lopdf object model.
//!
//! Callers position everything in points measured from the top-left corner
//! of an A4 sheet; the canvas flips to PDF's bottom-up coordinates.

use std::collections::BTreeMap;

use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, dictionary};
use tracing::debug;

use crate::error::Result;

use super::image::PdfImage;
use super::metrics::{FontFamily, FontStyle};

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// Points per millimetre.
pub const MM: f32 = 72.0 / 25.4;

pub type Rgb = (u8, u8, u8);

pub const BLACK: Rgb = (0, 0, 0);

/// Where a link annotation points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A named destination inside the document.
    Destination(String),
    Uri(String),
}

/// An image XObject registered with the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default)]
struct PageBuffer {
    ops: Vec<Operation>,
    links: Vec<([f32; 4], LinkTarget)>,
}

/// A document under construction.
pub struct Canvas {
    doc: Document,
    family: FontFamily,
    pages: Vec<PageBuffer>,
    /// Name to (page index, top offset). First registration wins.
    destinations: BTreeMap<String, (usize, f32)>,
    images: Vec<(String, ObjectId)>,
}

/// Encodes text as WinAnsi, replacing anything it cannot hold with `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

fn flip(top: f32) -> f32 {
    PAGE_HEIGHT - top
}

fn rgb_operands((r, g, b): Rgb) -> Vec<Object> {
    [r, g, b]
        .iter()
        .map(|c| Object::Real(f32::from(*c) / 255.0))
        .collect()
}

impl Canvas {
    pub fn new(family: FontFamily) -> Self {
        Self {
            doc: Document::with_version("1.7"),
            family,
            pages: Vec::new(),
            destinations: BTreeMap::new(),
            images: Vec::new(),
        }
    }

    pub fn family(&self) -> FontFamily {
        self.family
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Starts a new page and returns its index.
    pub fn add_page(&mut self) -> usize {
        self.pages.push(PageBuffer::default());
        self.pages.len() - 1
    }

    fn current(&mut self) -> &mut PageBuffer {
        if self.pages.is_empty() {
            self.add_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Width of `text` once encoded, in points.
    pub fn text_width(&self, encoded: &[u8], style: FontStyle, size: f32) -> f32 {
        self.family.text_width(encoded, style, size)
    }

    /// Draws one line of already-encoded text with its top edge at `top`.
    pub fn text(&mut self, x: f32, top: f32, style: FontStyle, size: f32, color: Rgb, encoded: &[u8]) {
        let baseline = flip(top + size * 0.8);
        let ops = &mut self.current().ops;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("rg", rgb_operands(color)));
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![style.resource_name().into(), size.into()],
        ));
        ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encoded.to_vec(), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    pub fn fill_rect(&mut self, x: f32, top: f32, width: f32, height: f32, color: Rgb) {
        let ops = &mut self.current().ops;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("rg", rgb_operands(color)));
        ops.push(Operation::new(
            "re",
            vec![x.into(), flip(top + height).into(), width.into(), height.into()],
        ));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Horizontal rule of the given thickness.
    pub fn rule(&mut self, x: f32, top: f32, width: f32, thickness: f32, color: Rgb) {
        self.fill_rect(x, top, width, thickness, color);
    }

    /// Strokes a rectangle with rounded corners of radius `r`.
    pub fn stroke_rounded_rect(&mut self, x: f32, top: f32, width: f32, height: f32, r: f32) {
        // Bezier control offset for a quarter circle.
        let k = r * 0.5523;
        let (left, right) = (x, x + width);
        let (upper, lower) = (flip(top), flip(top + height));

        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new("w", vec![0.5f32.into()]),
            Operation::new("m", vec![(left + r).into(), upper.into()]),
            Operation::new("l", vec![(right - r).into(), upper.into()]),
        ];
        let curve = |pts: [f32; 6]| Operation::new("c", pts.iter().map(|v| (*v).into()).collect());
        ops.push(curve([right - r + k, upper, right, upper - r + k, right, upper - r]));
        ops.push(Operation::new("l", vec![right.into(), (lower + r).into()]));
        ops.push(curve([right, lower + r - k, right - r + k, lower, right - r, lower]));
        ops.push(Operation::new("l", vec![(left + r).into(), lower.into()]));
        ops.push(curve([left + r - k, lower, left, lower + r - k, left, lower + r]));
        ops.push(Operation::new("l", vec![left.into(), (upper - r).into()]));
        ops.push(curve([left, upper - r + k, left + r - k, upper, left + r, upper]));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));

        self.current().ops.extend(ops);
    }

    /// Adds an image XObject to the document.
    pub fn add_image(&mut self, image: PdfImage) -> ImageHandle {
        let PdfImage {
            width,
            height,
            mut stream,
            soft_mask,
        } = image;
        if let Some(mask) = soft_mask {
            let mask_id = self.doc.add_object(mask);
            stream.dict.set("SMask", mask_id);
        }
        let id = self.doc.add_object(stream);
        let name = format!("Im{}", self.images.len() + 1);
        self.images.push((name.clone(), id));
        ImageHandle {
            name,
            width,
            height,
        }
    }

    pub fn draw_image(&mut self, image: &ImageHandle, x: f32, top: f32, width: f32, height: f32) {
        let ops = &mut self.current().ops;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                flip(top + height).into(),
            ],
        ));
        ops.push(Operation::new("Do", vec![image.name.as_str().into()]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Makes a rectangle on the current page clickable.
    pub fn link(&mut self, x: f32, top: f32, width: f32, height: f32, target: LinkTarget) {
        let rect = [x, flip(top + height), x + width, flip(top)];
        self.current().links.push((rect, target));
    }

    /// Registers a named destination at `top` on the current page.
    pub fn destination(&mut self, name: &str, top: f32) {
        let page = self.pages.len().saturating_sub(1);
        self.destinations
            .entry(name.to_string())
            .or_insert((page, top));
    }

    pub fn has_destination(&self, name: &str) -> bool {
        self.destinations.contains_key(name)
    }

    /// Builds the page tree, resources, annotations and named destinations.
    pub fn finish(mut self, title: &str) -> Result<Document> {
        if self.pages.is_empty() {
            self.add_page();
        }

        let doc = &mut self.doc;
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for style in FontStyle::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => self.family.base_font(style),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(style.resource_name(), font_id);
        }
        let mut xobjects = Dictionary::new();
        for (name, id) in &self.images {
            xobjects.set(name.as_str(), *id);
        }
        let resources_id = doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
        });

        let page_ids: Vec<ObjectId> = self.pages.iter().map(|_| doc.new_object_id()).collect();

        let mut dests = Dictionary::new();
        for (name, (page, top)) in &self.destinations {
            let target = vec![
                page_ids[*page].into(),
                "XYZ".into(),
                0.into(),
                flip(*top).into(),
                Object::Null,
            ];
            dests.set(name.as_str(), target);
        }

        for (buffer, page_id) in self.pages.iter().zip(&page_ids) {
            let content = Content {
                operations: buffer.ops.clone(),
            };
            let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, content.encode()?));

            let mut annots = Vec::new();
            for (rect, target) in &buffer.links {
                let action = match target {
                    LinkTarget::Destination(name) if self.destinations.contains_key(name) => {
                        dictionary! { "S" => "GoTo", "D" => name.as_str() }
                    }
                    LinkTarget::Destination(name) => {
                        debug!(destination = %name, "link to unknown destination dropped");
                        continue;
                    }
                    LinkTarget::Uri(uri) => dictionary! {
                        "S" => "URI",
                        "URI" => Object::string_literal(uri.as_bytes().to_vec()),
                    },
                };
                let rect: Vec<Object> = rect.iter().map(|v| (*v).into()).collect();
                annots.push(Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Link",
                    "Rect" => rect,
                    "Border" => vec![Object::Integer(0); 3],
                    "A" => action,
                })));
            }

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(PAGE_WIDTH),
                    Object::Real(PAGE_HEIGHT),
                ],
                "Contents" => content_id,
                "Resources" => resources_id,
            };
            if !annots.is_empty() {
                page.set("Annots", annots);
            }
            doc.objects.insert(*page_id, Object::Dictionary(page));
        }

        let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_ids.len() as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if !dests.is_empty() {
            catalog.set("Dests", dests);
        }
        let catalog_id = doc.add_object(catalog);
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(utf16_text(title), StringFormat::Hexadecimal),
            "Producer" => Object::string_literal("lessonexport"),
        });

        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        Ok(self.doc)
    }
}

/// Text string in UTF-16BE with a byte order mark.
fn utf16_text(text: &str) -> Vec<u8> {
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

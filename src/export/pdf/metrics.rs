//! Standard PDF fonts and their advance widths.

use tracing::warn;

/// The standard font families every PDF reader ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

/// Weight and slant of a run of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
}

impl FontStyle {
    pub const REGULAR: FontStyle = FontStyle {
        bold: false,
        italic: false,
    };
    pub const BOLD: FontStyle = FontStyle {
        bold: true,
        italic: false,
    };

    /// Resource name of this style inside page resources.
    pub fn resource_name(&self) -> &'static str {
        match (self.bold, self.italic) {
            (false, false) => "F1",
            (true, false) => "F2",
            (false, true) => "F3",
            (true, true) => "F4",
        }
    }

    pub const ALL: [FontStyle; 4] = [
        FontStyle {
            bold: false,
            italic: false,
        },
        FontStyle {
            bold: true,
            italic: false,
        },
        FontStyle {
            bold: false,
            italic: true,
        },
        FontStyle {
            bold: true,
            italic: true,
        },
    ];
}

impl FontFamily {
    /// Picks the family for a configured font name, falling back to
    /// Helvetica for anything that is not a standard font.
    pub fn from_config(name: Option<&str>) -> Self {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return FontFamily::Helvetica;
        };
        match name.to_ascii_lowercase().as_str() {
            "helvetica" | "arial" | "sans-serif" | "sans" => FontFamily::Helvetica,
            "times" | "times-roman" | "times new roman" | "serif" => FontFamily::Times,
            "courier" | "courier new" | "monospace" | "mono" => FontFamily::Courier,
            _ => {
                warn!(font = name, "not a standard PDF font, using Helvetica");
                FontFamily::Helvetica
            }
        }
    }

    /// PostScript name of the base font for a style.
    pub fn base_font(&self, style: FontStyle) -> &'static str {
        match (self, style.bold, style.italic) {
            (FontFamily::Helvetica, false, false) => "Helvetica",
            (FontFamily::Helvetica, true, false) => "Helvetica-Bold",
            (FontFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (FontFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (FontFamily::Times, false, false) => "Times-Roman",
            (FontFamily::Times, true, false) => "Times-Bold",
            (FontFamily::Times, false, true) => "Times-Italic",
            (FontFamily::Times, true, true) => "Times-BoldItalic",
            (FontFamily::Courier, false, false) => "Courier",
            (FontFamily::Courier, true, false) => "Courier-Bold",
            (FontFamily::Courier, false, true) => "Courier-Oblique",
            (FontFamily::Courier, true, true) => "Courier-BoldOblique",
        }
    }

    /// Width of WinAnsi-encoded text in points.
    ///
    /// Times uses the Helvetica tables; Times glyphs are narrower, so lines
    /// wrap a little early but never overflow.
    pub fn text_width(&self, encoded: &[u8], style: FontStyle, size: f32) -> f32 {
        let units: u32 = encoded
            .iter()
            .map(|&b| match self {
                FontFamily::Courier => 600,
                FontFamily::Helvetica | FontFamily::Times => helvetica_width(b, style.bold),
            })
            .map(u32::from)
            .sum();
        units as f32 * size / 1000.0
    }
}

fn helvetica_width(byte: u8, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match byte {
        32..=126 => table[usize::from(byte - 32)],
        _ => 556,
    }
}

/// Helvetica advance widths for bytes 32 through 126.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space to /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // : to @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A to M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N to Z
    278, 278, 278, 469, 556, 333, // [ to `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a to m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n to z
    334, 260, 334, 584, // { to ~
];

/// Helvetica-Bold advance widths for bytes 32 through 126.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // space to /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    333, 333, 584, 584, 584, 611, 975, // : to @
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A to M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N to Z
    333, 278, 333, 584, 556, 333, // [ to `
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a to m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n to z
    389, 280, 389, 584, // { to ~
];

//! Configuration file support.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// Operations a protected PDF can block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PdfPermission {
    Print,
    Modify,
    Copy,
    AnnotForms,
    FillForms,
    Extract,
    Assemble,
    PrintHigh,
}

impl PdfPermission {
    pub const ALL: [PdfPermission; 8] = [
        PdfPermission::Print,
        PdfPermission::Modify,
        PdfPermission::Copy,
        PdfPermission::AnnotForms,
        PdfPermission::FillForms,
        PdfPermission::Extract,
        PdfPermission::Assemble,
        PdfPermission::PrintHigh,
    ];

    /// Bit in the standard security handler's `/P` value.
    pub fn bit(&self) -> u32 {
        match self {
            PdfPermission::Print => 1 << 2,
            PdfPermission::Modify => 1 << 3,
            PdfPermission::Copy => 1 << 4,
            PdfPermission::AnnotForms => 1 << 5,
            PdfPermission::FillForms => 1 << 8,
            PdfPermission::Extract => 1 << 9,
            PdfPermission::Assemble => 1 << 10,
            PdfPermission::PrintHigh => 1 << 11,
        }
    }
}

/// Application configuration loaded from config file.
///
/// Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URL of the host site, used to recognise internal links and media
    pub site_url: String,

    /// SQLite database holding host tables, page order and the export queue
    pub database: Option<PathBuf>,

    /// Recipient of scheduled exports; scheduled sweeps are off when unset
    pub publish_email: Option<String>,

    /// Extra CSS applied to exported documents
    pub custom_style: Option<String>,

    /// Base font for PDF output (one of the standard PDF fonts)
    pub custom_font: Option<String>,

    /// Password that lifts the PDF restrictions
    pub pdf_password: Option<String>,

    /// Password needed to open the PDF at all
    pub pdf_user_password: Option<String>,

    /// Operations blocked in exported PDFs
    pub pdf_blocked_permissions: Vec<PdfPermission>,

    /// Text printed at the top of every content page
    pub header_watermark: Option<String>,

    /// Text printed at the bottom of every content page
    pub footer_watermark: Option<String>,

    /// Cover banner colour as `#rrggbb`
    pub cover_accent_colour: String,

    /// Image shown above the cover banner
    pub cover_logo: Option<PathBuf>,

    /// Metadata language of EPUB output
    pub language: String,

    /// Attempts before a queued export is reported as failed
    pub max_export_attempts: u32,

    /// Wall-clock budget for one export, in seconds
    pub time_budget_secs: u64,

    /// Directory for exports that are not streamed to the caller
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: "http://localhost".to_string(),
            database: None,
            publish_email: None,
            custom_style: None,
            custom_font: None,
            pdf_password: None,
            pdf_user_password: None,
            pdf_blocked_permissions: PdfPermission::ALL.to_vec(),
            header_watermark: None,
            footer_watermark: None,
            cover_accent_colour: "#12a053".to_string(),
            cover_logo: None,
            language: "en".to_string(),
            max_export_attempts: 2,
            time_budget_secs: 300,
            temp_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the default config file location.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file: {}", config_path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", config_path.display()))
    }

    /// Returns the path to the config file.
    ///
    /// Default: `~/.config/lessonexport/config.toml`
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lessonexport")
            .join("config.toml")
    }

    /// Resolve the database path, with CLI argument taking precedence.
    ///
    /// Precedence order:
    /// 1. CLI `--database` argument
    /// 2. Config file `database` setting
    /// 3. `lessonexport.db` in the data directory
    pub fn database_path(&self, cli_database: Option<&PathBuf>) -> PathBuf {
        cli_database
            .cloned()
            .or_else(|| self.database.clone())
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("lessonexport")
                    .join("lessonexport.db")
            })
    }

    /// Directory for file exports.
    pub fn export_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("lessonexport"))
    }

    /// Trimmed publish address, if one is set.
    pub fn publish_address(&self) -> Option<&str> {
        self.publish_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Parses the cover accent colour.
    pub fn accent_rgb(&self) -> crate::error::Result<(u8, u8, u8)> {
        parse_hex_colour(&self.cover_accent_colour).ok_or_else(|| {
            ExportError::Config(format!(
                "cover_accent_colour '{}' is not a #rrggbb colour",
                self.cover_accent_colour
            ))
        })
    }

    /// Whether exported PDFs need the standard security handler.
    pub fn pdf_protected(&self) -> bool {
        !self.pdf_blocked_permissions.is_empty()
            || self.pdf_user_password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Site root without a trailing slash.
    pub fn site_root(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }
}

fn parse_hex_colour(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

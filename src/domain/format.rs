//! Export formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Paginated, fixed-layout output.
    Pdf,
    /// Reflowable, spine-based package.
    Epub,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Pdf, ExportFormat::Epub];

    /// Returns the format tag used in URLs and capability names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Epub => "epub",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Epub => "application/epub+zip",
        }
    }

    /// Whether pages are laid out onto fixed-size sheets.
    pub fn is_paginated(&self) -> bool {
        matches!(self, ExportFormat::Pdf)
    }

    /// Capability a user needs to export in this format.
    pub fn capability(&self) -> String {
        format!("local/lessonexport:export{}", self.as_str())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown format tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown export format '{0}' (expected pdf or epub)")]
pub struct ParseFormatError(pub String);

impl FromStr for ExportFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "epub" => Ok(ExportFormat::Epub),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

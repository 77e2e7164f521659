//! Library error type.

use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Errors produced by the export pipeline and its entry points.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The acting user lacks a capability or group membership.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// A lesson, page or module does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// An embedded media reference could not be resolved.
    #[error("media unavailable: {url}")]
    MediaUnavailable { url: String },

    /// The export ran past its wall-clock budget.
    #[error("export exceeded its time budget of {budget_secs}s")]
    TimeBudgetExceeded { budget_secs: u64 },

    /// The reorder endpoint received an action it does not know.
    #[error("invalid action '{action}'")]
    InvalidAction { action: String },

    /// The document assembler was driven out of order.
    #[error("cannot {attempted} a document that is {state}")]
    AssemblerState {
        attempted: &'static str,
        state: &'static str,
    },

    /// Order or queue persistence failed.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// An I/O error occurred.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF object model rejected an operation.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// EPUB packaging failed.
    #[error("EPUB error: {message}")]
    Epub { message: String },

    /// A cover or page template failed to render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExportError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ExportError::NotFound { what: what.into() }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        ExportError::PermissionDenied {
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps an EPUB packaging failure.
    pub fn epub(err: impl Display) -> Self {
        ExportError::Epub {
            message: err.to_string(),
        }
    }
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

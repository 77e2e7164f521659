//! Output format types for CLI commands.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for programmatic consumption
    Json,
}

/// Wrapper for serializable command output.
#[derive(Debug, Serialize)]
pub struct Output<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> Output<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Prints `data` as `{"data": ...}` when JSON is asked for, otherwise runs
/// `human`.
pub fn emit<T: Serialize>(format: OutputFormat, data: T, human: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&Output::new(data))?),
        OutputFormat::Human => human(&data),
    }
    Ok(())
}

/// Result of an export.
#[derive(Debug, Serialize)]
pub struct ExportListing {
    pub lesson: i64,
    pub format: String,
    pub filename: String,
    pub path: String,
    pub bytes: usize,
}

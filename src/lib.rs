//! lessonexport - export sequential lessons to PDF and EPUB

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod host;
pub mod order;
pub mod queue;
pub mod rewrite;
pub mod store;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{
    Cli, Command,
    handlers::{handle_export, handle_links, handle_reorder, handle_sweep},
};
use config::Config;

/// Main entry point for the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let database = config.database_path(cli.database.as_ref());

    match &cli.command {
        Command::Export(args) => handle_export(args, &config, &database),
        Command::Reorder(args) => handle_reorder(args, &config, &database),
        Command::Sweep(args) => handle_sweep(args, &config, &database),
        Command::Links(args) => handle_links(args, &config, &database),
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lessonexport={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

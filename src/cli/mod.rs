//! CLI command definitions and handlers

pub mod handlers;
pub mod output;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{ExportFormat, GroupId, LessonId, PageId, UserId};
use output::OutputFormat;

/// lessonexport - export sequential lessons to PDF and EPUB
#[derive(Parser, Debug)]
#[command(name = "lessonexport", version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/lessonexport/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Host database (overrides config file)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export a lesson to PDF or EPUB
    Export(ExportArgs),

    /// Show or change the manual page order of a lesson
    Reorder(ReorderArgs),

    /// Run the scheduled export sweep once
    Sweep(SweepArgs),

    /// Show the export and reorder links a user gets for a lesson
    Links(LinksArgs),
}

/// Who a command acts as, and for whom.
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct ActorArgs {
    /// Acting user (omit to act as the system, without access checks)
    #[arg(short, long)]
    pub user: Option<UserId>,

    /// Group the request is scoped to
    #[arg(short, long)]
    pub group: Option<GroupId>,

    /// User the request is made for, when not the acting user
    #[arg(long = "for", value_name = "USER")]
    pub on_behalf_of: Option<UserId>,
}

/// Arguments for the `export` command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Lesson id
    pub lesson: LessonId,

    /// Document format
    #[arg(short = 't', long = "type", default_value_t = ExportFormat::Pdf)]
    pub export_type: ExportFormat,

    #[command(flatten)]
    pub actor: ActorArgs,

    /// Output file or directory (default: current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Reorder operations.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReorderCommand {
    #[default]
    List,
    Moveup,
    Movedown,
    Moveto,
}

impl ReorderCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReorderCommand::List => "list",
            ReorderCommand::Moveup => "moveup",
            ReorderCommand::Movedown => "movedown",
            ReorderCommand::Moveto => "moveto",
        }
    }
}

/// Arguments for the `reorder` command
#[derive(Parser, Debug)]
pub struct ReorderArgs {
    /// Lesson id
    pub lesson: LessonId,

    /// Operation to run
    #[arg(short, long, value_enum, default_value_t = ReorderCommand::List)]
    pub action: ReorderCommand,

    /// Page to move
    #[arg(short, long)]
    pub page: Option<PageId>,

    /// Target position for `moveto`
    #[arg(long)]
    pub position: Option<i64>,

    /// Acting user; must be able to manage the lesson
    #[arg(short, long)]
    pub user: UserId,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `sweep` command
#[derive(Parser, Debug)]
pub struct SweepArgs {
    /// Store sent notifications and their attachments here
    #[arg(long)]
    pub outbox: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `links` command
#[derive(Parser, Debug)]
pub struct LinksArgs {
    /// Lesson id
    pub lesson: LessonId,

    /// User the links are for
    #[arg(short, long)]
    pub user: UserId,

    /// Group passed through to the links
    #[arg(short, long)]
    pub group: Option<GroupId>,

    /// User passed through to the links
    #[arg(long = "for", value_name = "USER")]
    pub on_behalf_of: Option<UserId>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

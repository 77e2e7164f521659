//! Handler for the `export` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::ExportArgs;
use crate::cli::output::{ExportListing, emit};
use crate::config::Config;
use crate::export::{Actor, Artifact, Delivery, ExportRequest, LessonExporter};

use super::Session;

/// Handle the `export` command.
pub fn handle_export(args: &ExportArgs, config: &Config, database: &Path) -> Result<()> {
    let mut session = Session::open(config, database)?;
    let request = ExportRequest {
        lesson: args.lesson,
        format: args.export_type,
        actor: args.actor.user.map_or(Actor::System, Actor::User),
        group: args.actor.group,
        on_behalf_of: args.actor.on_behalf_of,
        delivery: Delivery::Download,
    };

    let artifact = LessonExporter::new(&session.host, config)
        .export(&mut session.store, &request)
        .with_context(|| format!("failed to export lesson {}", args.lesson))?;

    let Artifact::Download {
        filename, bytes, ..
    } = artifact
    else {
        anyhow::bail!("export of lesson {} did not return a document", args.lesson);
    };

    let path = output_path(args.output.as_deref(), &filename);
    std::fs::write(&path, &bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;

    let listing = ExportListing {
        lesson: args.lesson.get(),
        format: args.export_type.to_string(),
        filename,
        path: path.display().to_string(),
        bytes: bytes.len(),
    };
    emit(args.format, listing, |l| {
        println!("Exported lesson {} to {} ({} bytes)", l.lesson, l.path, l.bytes);
    })
}

/// An existing directory receives the document under its own name; any
/// other path is taken as the file to write.
pub(crate) fn output_path(output: Option<&Path>, filename: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(filename),
    }
}

//! Handler for the `links` command.

use std::path::Path;

use anyhow::Result;

use crate::cli::LinksArgs;
use crate::cli::output::emit;
use crate::config::Config;
use crate::export::export_links;
use crate::host::LessonSource;

use super::Session;

/// Handle the `links` command.
pub fn handle_links(args: &LinksArgs, config: &Config, database: &Path) -> Result<()> {
    let session = Session::open(config, database)?;
    let module = session.host.module_context(args.lesson)?;
    let links = export_links(
        &session.host,
        config,
        &module,
        args.user,
        args.on_behalf_of,
        args.group,
    )?;

    emit(args.format, links, |links| {
        if links.is_empty() {
            println!("No export links for user {}", args.user);
        }
        for (label, url) in links {
            println!("{label}: {url}");
        }
    })
}

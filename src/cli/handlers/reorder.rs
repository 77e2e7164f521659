//! Handler for the `reorder` command.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::ReorderArgs;
use crate::cli::output::emit;
use crate::config::Config;
use crate::export::{ReorderAction, ReorderReply, reorder};
use crate::host::LessonSource;

use super::Session;

/// Handle the `reorder` command.
pub fn handle_reorder(args: &ReorderArgs, config: &Config, database: &Path) -> Result<()> {
    let mut session = Session::open(config, database)?;
    let action = ReorderAction::parse(Some(args.action.as_str()), args.page, args.position)?;
    let module = session.host.module_context(args.lesson)?;

    let reply = reorder(&session.host, &mut session.store, &module, args.user, action)
        .with_context(|| format!("failed to reorder lesson {}", args.lesson))?;

    emit(args.format, reply, print_reply)
}

fn print_reply(reply: &ReorderReply) {
    match reply {
        ReorderReply::Listing(rows) => {
            for row in rows {
                let up = if row.can_move_up { "^" } else { " " };
                let down = if row.can_move_down { "v" } else { " " };
                println!("{:>3} {up}{down} {:>6}  {}", row.position, row.id, row.title);
            }
        }
        ReorderReply::Order(response) => {
            let mut order: Vec<_> = response.order.iter().collect();
            order.sort_by_key(|(_, pos)| **pos);
            for (page, pos) in order {
                println!("{pos:>3} {page}");
            }
        }
    }
}

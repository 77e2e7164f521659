//! Command handlers for the CLI.

mod export;
mod links;
mod reorder;
mod sweep;

#[cfg(test)]
pub(crate) mod tests;

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::host::SqliteHost;
use crate::store::SqliteStore;

pub use export::handle_export;
pub use links::handle_links;
pub use reorder::handle_reorder;
pub use sweep::handle_sweep;

// ===========================================
// Shared Utilities
// ===========================================

/// Host tables and exporter state, both kept in the one database file.
pub(crate) struct Session {
    pub host: SqliteHost,
    pub store: SqliteStore,
}

impl Session {
    pub(crate) fn open(config: &Config, database: &Path) -> Result<Self> {
        let host = SqliteHost::open(database, &config.site_url)
            .with_context(|| format!("failed to open host database: {}", database.display()))?;
        let store = SqliteStore::open(database)
            .with_context(|| format!("failed to open export store: {}", database.display()))?;
        Ok(Self { host, store })
    }
}

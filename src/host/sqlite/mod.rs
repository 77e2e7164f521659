//! SQLite-backed reference host.
//!
//! Reads lessons, users, groups and files from a small set of host tables
//! that mirror what a learning platform keeps. Notifications go to the log
//! and, optionally, to an outbox directory.

mod connection;
mod host_impl;
mod notifier;
mod schema;


use rusqlite::Connection;

use crate::error::ExportError;
use crate::store::StoreError;

pub use notifier::LogNotifier;
pub use schema::create_host_schema;

// ===========================================
// SqliteHost Struct
// ===========================================

/// A host whose content lives in SQLite tables.
pub struct SqliteHost {
    pub(crate) conn: Connection,
    site_url: String,
    notifier: LogNotifier,
}

impl SqliteHost {
    /// Routes notifications through `notifier` instead of the log only.
    pub fn with_notifier(mut self, notifier: LogNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }
}

fn db(err: rusqlite::Error) -> ExportError {
    StoreError::from(err).into()
}

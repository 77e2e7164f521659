//! Connection management for SqliteHost.

use std::fs;
use std::path::Path;

use rusqlite::Connection;

use super::{LogNotifier, SqliteHost, create_host_schema, db};
use crate::error::{ExportError, Result};

impl SqliteHost {
    // ===========================================
    // In-Memory Connection
    // ===========================================

    /// Opens an empty in-memory host.
    pub fn open_in_memory(site_url: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db)?;
        Self::init(conn, site_url)
    }

    // ===========================================
    // File-Based Connection
    // ===========================================

    /// Opens or creates a host database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path, site_url: &str) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        }

        let conn = Connection::open(path).map_err(db)?;
        Self::init(conn, site_url)
    }

    fn init(conn: Connection, site_url: &str) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(db)?;
        create_host_schema(&conn).map_err(db)?;
        Ok(Self {
            conn,
            site_url: site_url.trim_end_matches('/').to_string(),
            notifier: LogNotifier::default(),
        })
    }

    /// Returns a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

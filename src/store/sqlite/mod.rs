//! SQLite-backed order and queue store.

mod connection;
mod order_impl;
mod queue_impl;

#[cfg(test)]
mod tests;

use rusqlite::Connection;

// ===========================================
// SqliteStore Struct
// ===========================================

/// SQLite-backed store for page order, the export queue and sweep state.
pub struct SqliteStore {
    pub(crate) conn: Connection,
}

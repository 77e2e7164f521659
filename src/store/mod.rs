//! Persistence for page order, the export queue and sweep state

mod memory;
mod repository;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use repository::{
    PageOrderRepository, QueueChange, QueueEntry, QueueRepository, StoreError, StoreResult,
    SweepCursor,
};
pub use schema::{SCHEMA_VERSION, create_schema, get_schema_version};
pub use sqlite::SqliteStore;

//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_change_record_store;
mod in_memory_snapshot_cache;
mod postgres_change_record_store;

use sqlx::migrate::Migrator;

pub use in_memory_change_record_store::InMemoryChangeRecordStore;
pub use in_memory_snapshot_cache::InMemorySnapshotCache;
pub use postgres_change_record_store::PostgresChangeRecordStore;

/// Schema migrations for [`PostgresChangeRecordStore`].
///
/// Hosts run `MIGRATOR.run(&pool)` before constructing the store.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

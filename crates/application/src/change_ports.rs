mod entity;
mod id_generator;
mod snapshot_cache;
mod store;

pub use entity::{Loggable, PersistedEntity, metadata_of, object_state_of};
pub use id_generator::{ChangeIdGenerator, RandomChangeIdGenerator};
pub use snapshot_cache::SnapshotCache;
pub use store::{ChangeRecordQuery, ChangeRecordStore};

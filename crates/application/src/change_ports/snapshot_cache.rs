use async_trait::async_trait;
use tracklog_core::AppResult;
use tracklog_domain::{EntitySnapshot, SnapshotKey};

/// Working-set cache of entity state observed at load time.
///
/// Implementations must store owned copies and must not hold their lock
/// across any I/O.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Stores a snapshot, replacing any previous one for the same key.
    async fn save_snapshot(&self, snapshot: EntitySnapshot) -> AppResult<()>;

    /// Returns the most recent snapshot for one entity.
    async fn find_snapshot(&self, key: &SnapshotKey) -> AppResult<Option<EntitySnapshot>>;

    /// Drops the snapshot for one entity if present.
    async fn evict_snapshot(&self, key: &SnapshotKey) -> AppResult<()>;
}

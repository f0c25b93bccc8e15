use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracklog_application::SnapshotCache;
use tracklog_core::AppResult;
use tracklog_domain::{EntitySnapshot, SnapshotKey};

#[derive(Debug, Clone)]
struct SnapshotCacheEntry {
    snapshot: EntitySnapshot,
    expires_at: Option<Instant>,
}

impl SnapshotCacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Process-local snapshot cache guarded by a single lock.
///
/// Entries live until overwritten, evicted, or, when a ttl is configured,
/// until they expire.
#[derive(Debug, Default)]
pub struct InMemorySnapshotCache {
    entries: RwLock<HashMap<SnapshotKey, SnapshotCacheEntry>>,
    ttl: Option<Duration>,
}

impl InMemorySnapshotCache {
    /// Creates an empty cache whose entries never expire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache whose entries expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    /// Returns the number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every expired entry.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl SnapshotCache for InMemorySnapshotCache {
    async fn save_snapshot(&self, snapshot: EntitySnapshot) -> AppResult<()> {
        let expires_at = self.ttl.map(|ttl| {
            let now = Instant::now();
            now.checked_add(ttl).unwrap_or(now)
        });
        let key = snapshot.key().clone();

        self.entries.write().await.insert(
            key,
            SnapshotCacheEntry {
                snapshot,
                expires_at,
            },
        );

        Ok(())
    }

    async fn find_snapshot(&self, key: &SnapshotKey) -> AppResult<Option<EntitySnapshot>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(Instant::now()) => {
                    return Ok(Some(entry.snapshot.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            entries.remove(key);
        }

        Ok(None)
    }

    async fn evict_snapshot(&self, key: &SnapshotKey) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

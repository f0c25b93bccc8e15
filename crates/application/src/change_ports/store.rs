use async_trait::async_trait;
use tracklog_core::AppResult;
use tracklog_domain::{ActorId, ChangeAction, ChangeRecord, ChangeRecordIndexEntry};

/// Query parameters for change record listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecordQuery {
    /// Optional entity type filter.
    pub object_type: Option<String>,
    /// Optional entity primary key filter.
    pub object_id: Option<String>,
    /// Optional actor filter resolved through the index.
    pub actor_id: Option<ActorId>,
    /// Optional action filter.
    pub action: Option<ChangeAction>,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}

impl ChangeRecordQuery {
    /// Largest page a store returns for one query.
    pub const MAX_LIMIT: usize = 500;

    /// Returns the audit trail query for one entity instance.
    #[must_use]
    pub fn for_object(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: Some(object_type.into()),
            object_id: Some(object_id.into()),
            actor_id: None,
            action: None,
            limit: Self::MAX_LIMIT,
            offset: 0,
        }
    }

    /// Returns the query for every change made by one actor.
    #[must_use]
    pub fn for_actor(actor_id: ActorId) -> Self {
        Self {
            object_type: None,
            object_id: None,
            actor_id: Some(actor_id),
            action: None,
            limit: Self::MAX_LIMIT,
            offset: 0,
        }
    }

    /// Returns the limit clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn capped_limit(&self) -> usize {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }

    /// Returns whether a record and its actor satisfy the filters.
    #[must_use]
    pub fn matches(&self, record: &ChangeRecord, actor_id: ActorId) -> bool {
        self.object_type
            .as_deref()
            .is_none_or(|object_type| record.object_type().as_str() == object_type)
            && self
                .object_id
                .as_deref()
                .is_none_or(|object_id| record.object_id().as_str() == object_id)
            && self.actor_id.is_none_or(|expected| expected == actor_id)
            && self.action.is_none_or(|action| record.action() == action)
    }
}

/// Port for persisting and reading change records.
#[async_trait]
pub trait ChangeRecordStore: Send + Sync {
    /// Persists a record and its index entry as one unit.
    ///
    /// Either both rows become visible or neither does.
    async fn create_record_and_index(
        &self,
        record: ChangeRecord,
        index_entry: ChangeRecordIndexEntry,
    ) -> AppResult<()>;

    /// Returns the most recently created record for one entity instance.
    async fn latest_record(
        &self,
        object_type: &str,
        object_id: &str,
    ) -> AppResult<Option<ChangeRecord>>;

    /// Lists records matching a query, oldest first.
    async fn list_records(&self, query: ChangeRecordQuery) -> AppResult<Vec<ChangeRecord>>;
}

use std::sync::Arc;

use tracklog_core::AppResult;
use tracklog_domain::{ActorId, ChangeRecord};

use crate::change_ports::{ChangeRecordQuery, ChangeRecordStore};

/// Read-side service over persisted change records.
#[derive(Clone)]
pub struct ChangeHistoryService {
    store: Arc<dyn ChangeRecordStore>,
}

impl ChangeHistoryService {
    /// Creates a service from a store implementation.
    #[must_use]
    pub fn new(store: Arc<dyn ChangeRecordStore>) -> Self {
        Self { store }
    }

    /// Returns the full audit trail of one entity instance, oldest first.
    ///
    /// The store is read page by page until a short page comes back.
    pub async fn history_for_object(
        &self,
        object_type: &str,
        object_id: &str,
    ) -> AppResult<Vec<ChangeRecord>> {
        let mut query = ChangeRecordQuery::for_object(object_type, object_id);
        let mut trail = Vec::new();

        loop {
            let page = self.store.list_records(query.clone()).await?;
            let page_len = page.len();
            trail.extend(page);

            if page_len < query.capped_limit() {
                return Ok(trail);
            }
            query.offset += page_len;
        }
    }

    /// Returns one page of changes made by an actor, oldest first.
    pub async fn history_for_actor(
        &self,
        actor_id: ActorId,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<ChangeRecord>> {
        let mut query = ChangeRecordQuery::for_actor(actor_id);
        query.limit = limit;
        query.offset = offset;

        self.store.list_records(query).await
    }

    /// Returns the newest record of one entity instance.
    pub async fn latest_for_object(
        &self,
        object_type: &str,
        object_id: &str,
    ) -> AppResult<Option<ChangeRecord>> {
        self.store.latest_record(object_type, object_id).await
    }

    /// Lists records with caller-supplied filters.
    pub async fn list(&self, query: ChangeRecordQuery) -> AppResult<Vec<ChangeRecord>> {
        self.store.list_records(query).await
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use tracklog_application::{ChangeRecordQuery, ChangeRecordStore};
use tracklog_core::{AppError, AppResult};
use tracklog_domain::{ChangeRecord, ChangeRecordIndexEntry};
use uuid::Uuid;

#[cfg(test)]
mod tests;

#[derive(Debug, Default)]
struct ChangeRecordTables {
    records: Vec<ChangeRecord>,
    index_entries: HashMap<Uuid, ChangeRecordIndexEntry>,
}

/// In-memory change record store.
///
/// Records and index entries share one lock, so a pair is either fully
/// visible or not at all.
#[derive(Debug, Default)]
pub struct InMemoryChangeRecordStore {
    tables: RwLock<ChangeRecordTables>,
}

impl InMemoryChangeRecordStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn record_count(&self) -> usize {
        self.tables.read().await.records.len()
    }

    /// Returns the index entry of one record.
    pub async fn find_index_entry(&self, change_record_id: Uuid) -> Option<ChangeRecordIndexEntry> {
        self.tables
            .read()
            .await
            .index_entries
            .get(&change_record_id)
            .copied()
    }
}

#[async_trait]
impl ChangeRecordStore for InMemoryChangeRecordStore {
    async fn create_record_and_index(
        &self,
        record: ChangeRecord,
        index_entry: ChangeRecordIndexEntry,
    ) -> AppResult<()> {
        if index_entry.change_record_id() != record.id() {
            return Err(AppError::Validation(format!(
                "index entry references change record '{}' but record is '{}'",
                index_entry.change_record_id(),
                record.id()
            )));
        }

        let mut tables = self.tables.write().await;
        if tables.index_entries.contains_key(&record.id())
            || tables.records.iter().any(|stored| stored.id() == record.id())
        {
            return Err(AppError::Conflict(format!(
                "change record '{}' already exists",
                record.id()
            )));
        }

        debug!(
            change_record_id = %record.id(),
            action = %record.action(),
            object_type = %record.object_type(),
            object_id = %record.object_id(),
            "stored change record"
        );
        tables.index_entries.insert(record.id(), index_entry);
        tables.records.push(record);

        Ok(())
    }

    async fn latest_record(
        &self,
        object_type: &str,
        object_id: &str,
    ) -> AppResult<Option<ChangeRecord>> {
        let tables = self.tables.read().await;

        Ok(tables
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                record.object_type().as_str() == object_type
                    && record.object_id().as_str() == object_id
            })
            .max_by_key(|(position, record)| (record.created_at(), *position))
            .map(|(_, record)| record.clone()))
    }

    async fn list_records(&self, query: ChangeRecordQuery) -> AppResult<Vec<ChangeRecord>> {
        let tables = self.tables.read().await;

        let mut matched: Vec<&ChangeRecord> = tables
            .records
            .iter()
            .filter(|record| {
                let actor_id = tables
                    .index_entries
                    .get(&record.id())
                    .map(ChangeRecordIndexEntry::actor_id)
                    .unwrap_or_default();
                query.matches(record, actor_id)
            })
            .collect();
        matched.sort_by_key(|record| record.created_at());

        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(query.capped_limit())
            .cloned()
            .collect())
    }
}

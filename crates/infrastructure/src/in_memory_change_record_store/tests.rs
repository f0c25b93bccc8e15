use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracklog_application::{
    AuditOptions, ChangeHistoryService, ChangeRecordQuery, ChangeRecordStore, ChangeTracker,
    Loggable, PersistedEntity, TrackOutcome, metadata_of, object_state_of,
};
use tracklog_core::{AppError, AppResult};
use tracklog_domain::{
    ActorId, ChangeAction, ChangeRecord, ChangeRecordIndexEntry, ChangeRecordInput, NULL_DIFF,
    ObjectState,
};
use uuid::Uuid;

use super::InMemoryChangeRecordStore;
use crate::InMemorySnapshotCache;

fn record(object_id: &str, action: ChangeAction, minutes_ago: i64) -> ChangeRecord {
    ChangeRecord::new(ChangeRecordInput {
        id: Uuid::new_v4(),
        action,
        object_type: "Person".to_owned(),
        object_id: object_id.to_owned(),
        raw_object: format!(r#"{{"ID":{object_id}}}"#),
        raw_diff: NULL_DIFF.to_owned(),
        raw_meta: String::new(),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    })
    .unwrap_or_else(|_| unreachable!())
}

async fn store_with(
    store: &InMemoryChangeRecordStore,
    record: ChangeRecord,
    actor_id: u64,
) -> AppResult<()> {
    let index_entry = ChangeRecordIndexEntry::new(record.id(), ActorId::new(actor_id));
    store.create_record_and_index(record, index_entry).await
}

#[tokio::test]
async fn pair_is_rejected_when_index_references_other_record() {
    let store = InMemoryChangeRecordStore::new();
    let record = record("1", ChangeAction::Create, 0);

    let result = store
        .create_record_and_index(
            record,
            ChangeRecordIndexEntry::new(Uuid::new_v4(), ActorId::new(20)),
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(store.record_count().await, 0);
    assert!(matches!(store.latest_record("Person", "1").await, Ok(None)));
}

#[tokio::test]
async fn duplicate_record_id_leaves_store_unchanged() {
    let store = InMemoryChangeRecordStore::new();
    let record = record("1", ChangeAction::Create, 0);
    assert!(store_with(&store, record.clone(), 20).await.is_ok());

    let duplicate = store_with(&store, record.clone(), 99).await;

    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    assert_eq!(store.record_count().await, 1);
    assert_eq!(
        store
            .find_index_entry(record.id())
            .await
            .map(|entry| entry.actor_id()),
        Some(ActorId::new(20))
    );
}

#[tokio::test]
async fn latest_record_follows_creation_time() {
    let store = InMemoryChangeRecordStore::new();
    let newest = record("1", ChangeAction::Update, 1);
    assert!(store_with(&store, newest.clone(), 20).await.is_ok());
    assert!(
        store_with(&store, record("1", ChangeAction::Create, 10), 20)
            .await
            .is_ok()
    );
    assert!(
        store_with(&store, record("2", ChangeAction::Create, 0), 20)
            .await
            .is_ok()
    );

    let latest = store.latest_record("Person", "1").await.unwrap_or_default();
    assert_eq!(latest.map(|record| record.id()), Some(newest.id()));
}

#[tokio::test]
async fn list_filters_by_actor_and_orders_oldest_first() {
    let store = InMemoryChangeRecordStore::new();
    let older = record("1", ChangeAction::Create, 5);
    let newer = record("2", ChangeAction::Create, 1);
    assert!(store_with(&store, newer.clone(), 20).await.is_ok());
    assert!(store_with(&store, older.clone(), 20).await.is_ok());
    assert!(
        store_with(&store, record("3", ChangeAction::Create, 3), 21)
            .await
            .is_ok()
    );

    let listed = store
        .list_records(ChangeRecordQuery::for_actor(ActorId::new(20)))
        .await
        .unwrap_or_default();

    let ids: Vec<Uuid> = listed.iter().map(ChangeRecord::id).collect();
    assert_eq!(ids, vec![older.id(), newer.id()]);
}

#[tokio::test]
async fn list_applies_offset_and_limit() {
    let store = InMemoryChangeRecordStore::new();
    for minutes_ago in (0..5).rev() {
        assert!(
            store_with(&store, record("1", ChangeAction::Update, minutes_ago), 20)
                .await
                .is_ok()
        );
    }

    let mut query = ChangeRecordQuery::for_object("Person", "1");
    query.offset = 1;
    query.limit = 2;

    let listed = store.list_records(query).await.unwrap_or_default();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn object_history_is_not_truncated_at_page_limit() {
    let store = Arc::new(InMemoryChangeRecordStore::new());
    let stored = ChangeRecordQuery::MAX_LIMIT + 101;
    for position in 0..stored {
        let minutes_ago = i64::try_from(stored - position).unwrap_or_default();
        assert!(
            store_with(&store, record("1", ChangeAction::Update, minutes_ago), 20)
                .await
                .is_ok()
        );
    }
    let history = ChangeHistoryService::new(store.clone());

    let trail = history
        .history_for_object("Person", "1")
        .await
        .unwrap_or_default();
    let latest = history
        .latest_for_object("Person", "1")
        .await
        .unwrap_or_default()
        .map(|record| record.id());

    assert_eq!(trail.len(), stored);
    assert_eq!(trail.last().map(ChangeRecord::id), latest);
}

#[derive(Debug, Clone, Serialize)]
struct Person {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "UserID")]
    user_id: u64,
}

#[derive(Serialize)]
struct PersonMeta {
    #[serde(rename = "UserID")]
    user_id: u64,
}

impl Loggable for Person {
    fn object_type(&self) -> &str {
        "Person"
    }

    fn primary_key(&self) -> String {
        self.id.to_string()
    }

    fn loggable_fields(&self) -> &[&'static str] {
        &["Name", "UserID"]
    }

    fn object_state(&self) -> AppResult<ObjectState> {
        object_state_of(self)
    }

    fn audit_metadata(&self) -> AppResult<Option<Value>> {
        metadata_of(&PersonMeta {
            user_id: self.user_id,
        })
    }
}

impl PersistedEntity for Person {
    fn loggable(&self) -> Option<&dyn Loggable> {
        Some(self)
    }
}

#[tokio::test]
async fn create_load_update_delete_produces_audit_trail() {
    let store = Arc::new(InMemoryChangeRecordStore::new());
    let cache = Arc::new(InMemorySnapshotCache::new());
    let tracker = ChangeTracker::new(
        cache.clone(),
        store.clone(),
        AuditOptions::default().with_compute_diff(),
    );
    let history = ChangeHistoryService::new(store.clone());

    let mut person = Person {
        id: 1,
        name: "Pat".to_owned(),
        user_id: 20,
    };

    let created = tracker.on_create(&person).await;
    assert!(matches!(created, Ok(TrackOutcome::Recorded(_))));
    let trail = history
        .history_for_object("Person", "1")
        .await
        .unwrap_or_default();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action(), ChangeAction::Create);
    assert_eq!(trail[0].raw_diff(), "null");

    assert!(tracker.on_load(&person).await.is_ok());
    person.name = "John".to_owned();
    let updated = tracker.on_update(&person).await;
    let update_record = updated
        .ok()
        .and_then(|outcome| outcome.record().cloned())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(update_record.action(), ChangeAction::Update);
    assert_eq!(update_record.raw_diff(), r#"{"Name":"John"}"#);
    assert_eq!(
        store
            .find_index_entry(update_record.id())
            .await
            .map(|entry| entry.actor_id()),
        Some(ActorId::new(20))
    );

    let deleted = tracker.on_delete(&person).await;
    assert!(matches!(deleted, Ok(TrackOutcome::Recorded(_))));
    assert!(cache.is_empty().await);

    let trail = history
        .history_for_object("Person", "1")
        .await
        .unwrap_or_default();
    let actions: Vec<ChangeAction> = trail.iter().map(ChangeRecord::action).collect();
    assert_eq!(
        actions,
        vec![ChangeAction::Create, ChangeAction::Update, ChangeAction::Delete]
    );
    assert_eq!(trail[2].raw_diff(), "null");

    let by_actor = history
        .history_for_actor(ActorId::new(20), 10, 0)
        .await
        .unwrap_or_default();
    assert_eq!(by_actor.len(), 3);

    let decoded = trail[1].decode_object::<Value>().unwrap_or_default();
    assert_eq!(decoded, json!({ "ID": 1, "Name": "John", "UserID": 20 }));
}

#[tokio::test]
async fn lazy_update_against_in_memory_history() {
    let store = Arc::new(InMemoryChangeRecordStore::new());
    let tracker = ChangeTracker::new(
        Arc::new(InMemorySnapshotCache::new()),
        store.clone(),
        AuditOptions::default().with_lazy_update(["Name"]),
    );
    let mut person = Person {
        id: 7,
        name: "Pat".to_owned(),
        user_id: 20,
    };

    assert!(tracker.on_create(&person).await.is_ok());
    assert!(matches!(
        tracker.on_update(&person).await,
        Ok(TrackOutcome::Suppressed)
    ));
    assert_eq!(store.record_count().await, 1);

    person.name = "Sam".to_owned();
    assert!(matches!(
        tracker.on_update(&person).await,
        Ok(TrackOutcome::Recorded(_))
    ));
    assert_eq!(store.record_count().await, 2);
}

mod assembler;
mod suppression;


use std::sync::Arc;

use tracing::{debug, warn};
use tracklog_core::AppResult;
use tracklog_domain::{
    ChangeAction, ChangeRecord, EntitySnapshot, FieldDiff, ObjectState, SnapshotKey,
    compute_update_diff,
};

use crate::AuditOptions;
use crate::change_ports::{
    ChangeIdGenerator, ChangeRecordStore, Loggable, PersistedEntity, RandomChangeIdGenerator,
    SnapshotCache,
};

pub use assembler::{AssembledChange, ChangeRecordAssembler};
pub use suppression::SuppressionPolicy;

/// Result of one mutation notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// A record and its index entry were persisted.
    Recorded(ChangeRecord),
    /// The update matched the last persisted record on every watched field.
    Suppressed,
    /// The entity does not opt into tracking or is disabled.
    Skipped,
}

impl TrackOutcome {
    /// Returns the persisted record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&ChangeRecord> {
        match self {
            Self::Recorded(record) => Some(record),
            Self::Suppressed | Self::Skipped => None,
        }
    }
}

/// Lifecycle hook adapter driving snapshots, diffs and record persistence.
///
/// The host persistence engine calls `on_load` after reading rows and the
/// mutation hooks around writes. Every hook completes within the awaiting
/// call.
#[derive(Clone)]
pub struct ChangeTracker {
    snapshot_cache: Arc<dyn SnapshotCache>,
    store: Arc<dyn ChangeRecordStore>,
    assembler: ChangeRecordAssembler,
    suppression: Option<SuppressionPolicy>,
    options: AuditOptions,
}

impl ChangeTracker {
    /// Creates a tracker with random record identifiers.
    #[must_use]
    pub fn new(
        snapshot_cache: Arc<dyn SnapshotCache>,
        store: Arc<dyn ChangeRecordStore>,
        options: AuditOptions,
    ) -> Self {
        let suppression = options.lazy_update().then(|| {
            SuppressionPolicy::new(store.clone(), options.lazy_update_fields().to_vec())
        });

        Self {
            snapshot_cache,
            store,
            assembler: ChangeRecordAssembler::new(Arc::new(RandomChangeIdGenerator)),
            suppression,
            options,
        }
    }

    /// Replaces the record identifier source.
    #[must_use]
    pub fn with_id_generator(mut self, id_generator: Arc<dyn ChangeIdGenerator>) -> Self {
        self.assembler = ChangeRecordAssembler::new(id_generator);
        self
    }

    /// Returns the active options.
    #[must_use]
    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    /// Captures the loaded state of one entity.
    pub async fn on_load(&self, entity: &dyn PersistedEntity) -> AppResult<()> {
        let Some(loggable) = tracked(entity) else {
            return Ok(());
        };

        let key = snapshot_key(loggable)?;
        let state = loggable.object_state()?;
        let fields: ObjectState = loggable
            .loggable_fields()
            .iter()
            .filter_map(|field_name| {
                state
                    .get(*field_name)
                    .map(|value| ((*field_name).to_owned(), value.clone()))
            })
            .collect();

        self.snapshot_cache
            .save_snapshot(EntitySnapshot::new(key, fields))
            .await
    }

    /// Captures the loaded state of every entity in a result set.
    pub async fn on_load_all<'a, I>(&self, entities: I) -> AppResult<()>
    where
        I: IntoIterator<Item = &'a dyn PersistedEntity>,
    {
        for entity in entities {
            self.on_load(entity).await?;
        }

        Ok(())
    }

    /// Records the creation of an entity.
    pub async fn on_create(&self, entity: &dyn PersistedEntity) -> AppResult<TrackOutcome> {
        let Some(loggable) = tracked(entity) else {
            return Ok(TrackOutcome::Skipped);
        };

        let state = loggable.object_state()?;
        self.record(loggable, ChangeAction::Create, &state, None)
            .await
    }

    /// Records an update unless the suppression policy deems it a no-op.
    pub async fn on_update(&self, entity: &dyn PersistedEntity) -> AppResult<TrackOutcome> {
        let Some(loggable) = tracked(entity) else {
            return Ok(TrackOutcome::Skipped);
        };

        let state = loggable.object_state()?;

        if let Some(suppression) = &self.suppression
            && suppression.should_suppress(loggable, &state).await
        {
            debug!(
                object_type = %loggable.object_type(),
                object_id = %loggable.primary_key(),
                "suppressed update with no watched field change"
            );
            return Ok(TrackOutcome::Suppressed);
        }

        let diff = if self.options.compute_diff() {
            self.compute_diff(loggable, &state).await?
        } else {
            None
        };

        self.record(loggable, ChangeAction::Update, &state, diff.as_ref())
            .await
    }

    /// Records the deletion of an entity and forgets its snapshot.
    pub async fn on_delete(&self, entity: &dyn PersistedEntity) -> AppResult<TrackOutcome> {
        let Some(loggable) = tracked(entity) else {
            return Ok(TrackOutcome::Skipped);
        };

        let state = loggable.object_state()?;
        let outcome = self
            .record(loggable, ChangeAction::Delete, &state, None)
            .await?;

        if let Err(error) = self
            .snapshot_cache
            .evict_snapshot(&snapshot_key(loggable)?)
            .await
        {
            warn!(
                object_type = %loggable.object_type(),
                object_id = %loggable.primary_key(),
                error = %error,
                "failed to evict snapshot after recording delete"
            );
        }

        Ok(outcome)
    }

    async fn compute_diff(
        &self,
        loggable: &dyn Loggable,
        state: &ObjectState,
    ) -> AppResult<Option<FieldDiff>> {
        let old_snapshot = self
            .snapshot_cache
            .find_snapshot(&snapshot_key(loggable)?)
            .await?;

        Ok(compute_update_diff(
            old_snapshot.as_ref(),
            state,
            loggable.loggable_fields(),
        ))
    }

    async fn record(
        &self,
        loggable: &dyn Loggable,
        action: ChangeAction,
        state: &ObjectState,
        diff: Option<&FieldDiff>,
    ) -> AppResult<TrackOutcome> {
        let AssembledChange {
            record,
            index_entry,
        } = self.assembler.build(loggable, action, state, diff)?;

        self.store
            .create_record_and_index(record.clone(), index_entry)
            .await?;

        Ok(TrackOutcome::Recorded(record))
    }
}

fn tracked(entity: &dyn PersistedEntity) -> Option<&dyn Loggable> {
    let loggable = entity.loggable()?;
    if !loggable.is_logging_enabled() {
        debug!(
            object_type = %loggable.object_type(),
            "change tracking disabled for entity instance"
        );
        return None;
    }

    Some(loggable)
}

fn snapshot_key(loggable: &dyn Loggable) -> AppResult<SnapshotKey> {
    SnapshotKey::new(loggable.object_type(), loggable.primary_key())
}

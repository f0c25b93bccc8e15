use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracklog_core::{AppError, AppResult};
use tracklog_domain::{
    ActorId, ChangeAction, ChangeRecord, ChangeRecordIndexEntry, ChangeRecordInput, FieldDiff,
    NULL_DIFF, ObjectState,
};

use crate::change_ports::{ChangeIdGenerator, Loggable};

/// A change record paired with its index entry, persisted as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledChange {
    /// Immutable audit row.
    pub record: ChangeRecord,
    /// Actor index row referencing `record`.
    pub index_entry: ChangeRecordIndexEntry,
}

/// Builds change records and their actor index entries.
#[derive(Clone)]
pub struct ChangeRecordAssembler {
    id_generator: Arc<dyn ChangeIdGenerator>,
}

impl ChangeRecordAssembler {
    /// Creates an assembler drawing identifiers from the provided generator.
    #[must_use]
    pub fn new(id_generator: Arc<dyn ChangeIdGenerator>) -> Self {
        Self { id_generator }
    }

    /// Assembles the record for one accepted lifecycle event.
    ///
    /// Encoding runs before the identifier is drawn. `diff` is only stored
    /// for updates.
    pub fn build(
        &self,
        entity: &dyn Loggable,
        action: ChangeAction,
        state: &ObjectState,
        diff: Option<&FieldDiff>,
    ) -> AppResult<AssembledChange> {
        let object_type = entity.object_type();
        let object_id = entity.primary_key();

        let raw_object = encode(state, "object snapshot", object_type, &object_id)?;
        let raw_diff = match (action, diff) {
            (ChangeAction::Update, Some(diff)) => encode(diff, "diff", object_type, &object_id)?,
            _ => NULL_DIFF.to_owned(),
        };

        let metadata = entity.audit_metadata()?;
        let raw_meta = match metadata.as_ref() {
            Some(metadata) => encode(metadata, "metadata", object_type, &object_id)?,
            None => String::new(),
        };
        let actor_id = ActorId::from_metadata(metadata.as_ref())?;

        let record = ChangeRecord::new(ChangeRecordInput {
            id: self.id_generator.next_id()?,
            action,
            object_type: object_type.to_owned(),
            object_id,
            raw_object,
            raw_diff,
            raw_meta,
            created_at: Utc::now(),
        })?;
        let index_entry = ChangeRecordIndexEntry::new(record.id(), actor_id);

        Ok(AssembledChange {
            record,
            index_entry,
        })
    }
}

fn encode<T: Serialize + ?Sized>(
    value: &T,
    label: &str,
    object_type: &str,
    object_id: &str,
) -> AppResult<String> {
    serde_json::to_string(value).map_err(|error| {
        AppError::Serialization(format!(
            "failed to encode {label} for '{object_type}' '{object_id}': {error}"
        ))
    })
}

//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod change_record;
mod field_diff;
mod snapshot;

pub use change_record::{
    ActorId, ChangeAction, ChangeRecord, ChangeRecordIndexEntry, ChangeRecordInput, NULL_DIFF,
    USER_ID_METADATA_FIELD,
};
pub use field_diff::{FieldDiff, compute_update_diff, watched_fields_match};
pub use snapshot::{EntitySnapshot, ObjectState, SnapshotKey};

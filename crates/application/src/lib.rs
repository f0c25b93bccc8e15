//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_options;
mod change_history_service;
mod change_ports;
mod change_tracker;

pub use audit_options::{
    AuditOptions, COMPUTE_DIFF_ENV, LAZY_UPDATE_ENV, LAZY_UPDATE_FIELDS_ENV,
};
pub use change_history_service::ChangeHistoryService;
pub use change_ports::{
    ChangeIdGenerator, ChangeRecordQuery, ChangeRecordStore, Loggable, PersistedEntity,
    RandomChangeIdGenerator, SnapshotCache, metadata_of, object_state_of,
};
pub use change_tracker::{
    AssembledChange, ChangeRecordAssembler, ChangeTracker, SuppressionPolicy, TrackOutcome,
};

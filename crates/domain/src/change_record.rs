use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracklog_core::{AppError, AppResult, NonEmptyString};
use uuid::Uuid;

use crate::field_diff::FieldDiff;
use crate::snapshot::ObjectState;

/// Stored diff value used when no diff was computed.
pub const NULL_DIFF: &str = "null";

/// Metadata field carrying the acting user identifier.
pub const USER_ID_METADATA_FIELD: &str = "UserID";

/// Lifecycle action captured by a change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// The entity was inserted.
    Create,
    /// The entity was saved over an existing row.
    Update,
    /// The entity was removed.
    Delete,
}

impl ChangeAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for ChangeAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown change action value '{value}'"
            ))),
        }
    }
}

impl Display for ChangeAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of the user that performed a change. Zero means "unknown".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActorId(u64);

impl ActorId {
    /// Creates an actor identifier from a raw value.
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns whether this is the zero "unknown actor" value.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == 0
    }

    /// Extracts the actor from an entity metadata blob.
    ///
    /// Missing metadata, a non-object blob, or an absent or `null` `UserID`
    /// field all yield the zero actor. A present `UserID` that is not an
    /// unsigned integer (or a decimal string of one) is rejected.
    pub fn from_metadata(metadata: Option<&Value>) -> AppResult<Self> {
        let Some(user_id) = metadata.and_then(|meta| meta.get(USER_ID_METADATA_FIELD)) else {
            return Ok(Self::default());
        };

        match user_id {
            Value::Null => Ok(Self::default()),
            Value::Number(number) => number.as_u64().map(Self).ok_or_else(|| {
                AppError::Serialization(format!(
                    "metadata field '{USER_ID_METADATA_FIELD}' must be an unsigned integer, got {number}"
                ))
            }),
            Value::String(text) => text.trim().parse::<u64>().map(Self).map_err(|error| {
                AppError::Serialization(format!(
                    "metadata field '{USER_ID_METADATA_FIELD}' is not a valid identifier: {error}"
                ))
            }),
            other => Err(AppError::Serialization(format!(
                "metadata field '{USER_ID_METADATA_FIELD}' has unsupported value {other}"
            ))),
        }
    }
}

impl Display for ActorId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Input used to construct a [`ChangeRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeRecordInput {
    /// Unique record identifier.
    pub id: Uuid,
    /// Captured lifecycle action.
    pub action: ChangeAction,
    /// Entity type name.
    pub object_type: String,
    /// Entity primary key rendered as a string.
    pub object_id: String,
    /// JSON encoded full entity state.
    pub raw_object: String,
    /// JSON encoded diff, or `"null"`.
    pub raw_diff: String,
    /// JSON encoded metadata, or empty when the entity supplied none.
    pub raw_meta: String,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Immutable audit row describing one create, update or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChangeRecordInput")]
pub struct ChangeRecord {
    id: Uuid,
    action: ChangeAction,
    object_type: NonEmptyString,
    object_id: NonEmptyString,
    raw_object: String,
    raw_diff: String,
    raw_meta: String,
    created_at: DateTime<Utc>,
}

impl ChangeRecord {
    /// Creates a validated change record.
    pub fn new(input: ChangeRecordInput) -> AppResult<Self> {
        if input.raw_object.trim().is_empty() {
            return Err(AppError::Validation(
                "change record object snapshot must not be empty".to_owned(),
            ));
        }

        let raw_diff = if input.raw_diff.trim().is_empty() {
            NULL_DIFF.to_owned()
        } else {
            input.raw_diff
        };

        Ok(Self {
            id: input.id,
            action: input.action,
            object_type: NonEmptyString::new(input.object_type)?,
            object_id: NonEmptyString::new(input.object_id)?,
            raw_object: input.raw_object,
            raw_diff,
            raw_meta: input.raw_meta,
            created_at: input.created_at,
        })
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the captured action.
    #[must_use]
    pub fn action(&self) -> ChangeAction {
        self.action
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn object_type(&self) -> &NonEmptyString {
        &self.object_type
    }

    /// Returns the entity primary key.
    #[must_use]
    pub fn object_id(&self) -> &NonEmptyString {
        &self.object_id
    }

    /// Returns the JSON encoded entity state.
    #[must_use]
    pub fn raw_object(&self) -> &str {
        self.raw_object.as_str()
    }

    /// Returns the JSON encoded diff, `"null"` when none was computed.
    #[must_use]
    pub fn raw_diff(&self) -> &str {
        self.raw_diff.as_str()
    }

    /// Returns the JSON encoded metadata, empty when none was supplied.
    #[must_use]
    pub fn raw_meta(&self) -> &str {
        self.raw_meta.as_str()
    }

    /// Returns when the record was assembled.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Decodes the stored entity state into a typed value.
    pub fn decode_object<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_str(self.raw_object.as_str()).map_err(|error| {
            AppError::Serialization(format!(
                "failed to decode object snapshot of change record '{}': {error}",
                self.id
            ))
        })
    }

    /// Decodes the stored entity state as a field map.
    pub fn object_state(&self) -> AppResult<ObjectState> {
        self.decode_object()
    }

    /// Decodes the stored diff. `None` means no diff was computed.
    pub fn decode_diff(&self) -> AppResult<Option<FieldDiff>> {
        serde_json::from_str(self.raw_diff.as_str()).map_err(|error| {
            AppError::Serialization(format!(
                "failed to decode diff of change record '{}': {error}",
                self.id
            ))
        })
    }

    /// Decodes the stored metadata blob, if any.
    pub fn decode_meta(&self) -> AppResult<Option<Value>> {
        if self.raw_meta.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(self.raw_meta.as_str()).map_err(|error| {
            AppError::Serialization(format!(
                "failed to decode metadata of change record '{}': {error}",
                self.id
            ))
        })
    }
}

impl TryFrom<ChangeRecordInput> for ChangeRecord {
    type Error = AppError;

    fn try_from(input: ChangeRecordInput) -> Result<Self, Self::Error> {
        Self::new(input)
    }
}

/// Secondary index row linking a change record to its actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChangeRecordIndexEntry {
    change_record_id: Uuid,
    actor_id: ActorId,
}

impl ChangeRecordIndexEntry {
    /// Creates an index entry for one change record.
    #[must_use]
    pub fn new(change_record_id: Uuid, actor_id: ActorId) -> Self {
        Self {
            change_record_id,
            actor_id,
        }
    }

    /// Returns the referenced change record identifier.
    #[must_use]
    pub fn change_record_id(&self) -> Uuid {
        self.change_record_id
    }

    /// Returns the acting user.
    #[must_use]
    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }
}

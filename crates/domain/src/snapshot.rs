use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracklog_core::{AppResult, NonEmptyString};

/// Field name to value mapping of one entity at a point in time.
pub type ObjectState = Map<String, Value>;

/// Cache key identifying one entity instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    object_type: NonEmptyString,
    primary_key: NonEmptyString,
}

impl SnapshotKey {
    /// Creates a validated snapshot key.
    pub fn new(object_type: impl Into<String>, primary_key: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            object_type: NonEmptyString::new(object_type)?,
            primary_key: NonEmptyString::new(primary_key)?,
        })
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn object_type(&self) -> &NonEmptyString {
        &self.object_type
    }

    /// Returns the primary key rendered as a string.
    #[must_use]
    pub fn primary_key(&self) -> &NonEmptyString {
        &self.primary_key
    }
}

/// Owned copy of an entity's field values taken when the entity was loaded.
///
/// The snapshot holds its own `Value` tree, so later mutations of the live
/// entity never show through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    key: SnapshotKey,
    fields: ObjectState,
}

impl EntitySnapshot {
    /// Captures a snapshot from an already materialized object state.
    #[must_use]
    pub fn new(key: SnapshotKey, fields: ObjectState) -> Self {
        Self { key, fields }
    }

    /// Returns the snapshot cache key.
    #[must_use]
    pub fn key(&self) -> &SnapshotKey {
        &self.key
    }

    /// Returns every captured field.
    #[must_use]
    pub fn fields(&self) -> &ObjectState {
        &self.fields
    }

    /// Returns one captured field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{EntitySnapshot, ObjectState, SnapshotKey};

    fn state(value: Value) -> ObjectState {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn snapshot_key_requires_primary_key() {
        assert!(SnapshotKey::new("Person", "").is_err());
        assert!(SnapshotKey::new(" ", "1").is_err());
    }

    #[test]
    fn snapshot_does_not_observe_later_mutation_of_source_state() {
        let key = SnapshotKey::new("Person", "1").unwrap_or_else(|_| unreachable!());
        let mut live = state(json!({ "Name": "Pat" }));
        let snapshot = EntitySnapshot::new(key, live.clone());

        live.insert("Name".to_owned(), json!("John"));

        assert_eq!(snapshot.field("Name"), Some(&json!("Pat")));
    }
}

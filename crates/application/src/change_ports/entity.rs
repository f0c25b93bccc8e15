use serde::Serialize;
use serde_json::Value;
use tracklog_core::{AppError, AppResult};
use tracklog_domain::ObjectState;

/// Capability set of an entity type that opts into change tracking.
pub trait Loggable: Send + Sync {
    /// Returns the entity type name stored on change records.
    fn object_type(&self) -> &str;

    /// Returns the primary key rendered as a string.
    fn primary_key(&self) -> String;

    /// Returns the business fields compared when diffing, fixed per type.
    fn loggable_fields(&self) -> &[&'static str];

    /// Returns the full field set of the current value.
    fn object_state(&self) -> AppResult<ObjectState>;

    /// Returns whether tracking is enabled for this instance.
    fn is_logging_enabled(&self) -> bool {
        true
    }

    /// Returns the opaque metadata blob stored with each record.
    fn audit_metadata(&self) -> AppResult<Option<Value>> {
        Ok(None)
    }
}

/// Any value the host persistence engine sends lifecycle notifications for.
pub trait PersistedEntity: Send + Sync {
    /// Returns the tracking capability when the type opts in.
    fn loggable(&self) -> Option<&dyn Loggable> {
        None
    }
}

/// Serializes a model into the field map used for snapshots and records.
pub fn object_state_of<T: Serialize + ?Sized>(value: &T) -> AppResult<ObjectState> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(AppError::Serialization(format!(
            "tracked entity must serialize to a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(error) => Err(AppError::Serialization(format!(
            "failed to serialize tracked entity: {error}"
        ))),
    }
}

/// Serializes an entity metadata value for [`Loggable::audit_metadata`].
pub fn metadata_of<T: Serialize + ?Sized>(value: &T) -> AppResult<Option<Value>> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|error| AppError::Serialization(format!("failed to serialize metadata: {error}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::json;

    use super::{metadata_of, object_state_of};

    #[derive(Serialize)]
    struct Person {
        #[serde(rename = "Name")]
        name: String,
    }

    #[test]
    fn struct_serializes_to_field_map() {
        let state = object_state_of(&Person {
            name: "Pat".to_owned(),
        });
        assert_eq!(
            state.unwrap_or_default().get("Name"),
            Some(&json!("Pat"))
        );
    }

    #[test]
    fn non_object_state_is_a_serialization_error() {
        let result = object_state_of(&vec![1, 2, 3]);
        assert!(matches!(
            result,
            Err(tracklog_core::AppError::Serialization(_))
        ));
    }

    #[test]
    fn metadata_is_wrapped_in_some() {
        let metadata = metadata_of(&json!({ "UserID": 20 }));
        assert_eq!(
            metadata.unwrap_or_default(),
            Some(json!({ "UserID": 20 }))
        );
    }
}

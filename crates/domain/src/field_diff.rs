use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::{EntitySnapshot, ObjectState};

/// Field-level delta between a loaded snapshot and the state being written.
///
/// Holds only fields whose value changed, keyed by field name, with the new
/// value. An empty diff serializes to `{}`; "no diff" is modelled as `None`
/// by callers and serializes to `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldDiff(BTreeMap<String, Value>);

impl FieldDiff {
    /// Returns the new value recorded for one changed field.
    #[must_use]
    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.0.get(field_name)
    }

    /// Returns whether no field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of changed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over changed field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over changed fields and their new values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for FieldDiff {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Computes the update delta for the loggable fields of one entity.
///
/// Returns `None` when there is no snapshot to compare against. Fields not in
/// `loggable_fields` are never inspected. A field missing on one side compares
/// unequal to a present value; a field removed from the new state is recorded
/// as `null`.
#[must_use]
pub fn compute_update_diff(
    old_snapshot: Option<&EntitySnapshot>,
    new_state: &ObjectState,
    loggable_fields: &[&str],
) -> Option<FieldDiff> {
    let old_snapshot = old_snapshot?;

    Some(
        loggable_fields
            .iter()
            .filter_map(|field_name| {
                let new_value = new_state.get(*field_name);
                (old_snapshot.field(field_name) != new_value).then(|| {
                    (
                        (*field_name).to_owned(),
                        new_value.cloned().unwrap_or(Value::Null),
                    )
                })
            })
            .collect(),
    )
}

/// Returns whether two object states agree on every watched field.
///
/// Only watched names that are loggable count. When none remain, which
/// includes an empty `watched_fields` set, every loggable field is watched.
#[must_use]
pub fn watched_fields_match(
    prior_state: &ObjectState,
    current_state: &ObjectState,
    watched_fields: &[String],
    loggable_fields: &[&str],
) -> bool {
    let mut compared: Vec<&str> = watched_fields
        .iter()
        .map(String::as_str)
        .filter(|field_name| loggable_fields.contains(field_name))
        .collect();
    if compared.is_empty() {
        compared = loggable_fields.to_vec();
    }

    compared
        .iter()
        .all(|field_name| prior_state.get(*field_name) == current_state.get(*field_name))
}

use std::sync::Arc;

use tracing::warn;
use tracklog_domain::{ObjectState, watched_fields_match};

use crate::change_ports::{ChangeRecordStore, Loggable};

/// Lazy-update policy comparing an update against the last persisted record.
#[derive(Clone)]
pub struct SuppressionPolicy {
    store: Arc<dyn ChangeRecordStore>,
    watched_fields: Vec<String>,
}

impl SuppressionPolicy {
    /// Creates a policy watching the given fields, empty meaning all loggable fields.
    #[must_use]
    pub fn new(store: Arc<dyn ChangeRecordStore>, watched_fields: Vec<String>) -> Self {
        Self {
            store,
            watched_fields,
        }
    }

    /// Returns whether an update leaves every watched field unchanged.
    ///
    /// Missing or unreadable history never suppresses.
    pub async fn should_suppress(&self, entity: &dyn Loggable, new_state: &ObjectState) -> bool {
        let object_type = entity.object_type();
        let object_id = entity.primary_key();

        let prior = match self
            .store
            .latest_record(object_type, object_id.as_str())
            .await
        {
            Ok(Some(prior)) => prior,
            Ok(None) => return false,
            Err(error) => {
                warn!(
                    object_type = %object_type,
                    object_id = %object_id,
                    error = %error,
                    "failed to load change history, recording update"
                );
                return false;
            }
        };

        let prior_state = match prior.object_state() {
            Ok(prior_state) => prior_state,
            Err(error) => {
                warn!(
                    object_type = %object_type,
                    object_id = %object_id,
                    change_record_id = %prior.id(),
                    error = %error,
                    "stored object snapshot is unreadable, recording update"
                );
                return false;
            }
        };

        watched_fields_match(
            &prior_state,
            new_state,
            self.watched_fields.as_slice(),
            entity.loggable_fields(),
        )
    }
}

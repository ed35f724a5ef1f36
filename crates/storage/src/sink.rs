//! Persistence sink: one append per record, failures logged and absorbed.

use std::sync::Arc;

use tracing::{error, info};

use antiradar_core::{excerpt, NewLocationRecord, StoredRecord};

use crate::store::RecordStore;

pub struct PersistenceSink {
    store: Arc<dyn RecordStore>,
}

impl PersistenceSink {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Append `record`. Returns `None` when the store rejected it; the
    /// failed record is not retried.
    pub async fn persist(&self, record: &NewLocationRecord) -> Option<StoredRecord> {
        match self.store.append(record).await {
            Ok(stored) => {
                info!(
                    id = stored.id,
                    town = %record.town,
                    street = %record.street,
                    geocoded = record.coordinates.is_some(),
                    "record stored"
                );
                Some(stored)
            }
            Err(e) => {
                error!(
                    store = %self.store.name(),
                    error = %e,
                    message = %excerpt(&record.message),
                    "failed to store record"
                );
                None
            }
        }
    }
}

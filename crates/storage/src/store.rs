//! The record store boundary.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use antiradar_core::{LocationRecord, NewLocationRecord, StoredRecord};

use crate::error::StoreError;

/// Durable, append-only storage for location records.
///
/// The store owns `id` and `post_time`; both increase with insertion order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append one record atomically. On error nothing was written.
    async fn append(&self, record: &NewLocationRecord) -> Result<StoredRecord, StoreError>;

    /// Records with `post_time >= since`, oldest first.
    async fn query_range(&self, since: DateTime<Utc>) -> Result<Vec<LocationRecord>, StoreError>;

    /// Records from the last `hours` hours, oldest first.
    ///
    /// A window reaching past the earliest representable time is an
    /// [`StoreError::InvalidRange`].
    async fn recent(&self, hours: u32) -> Result<Vec<LocationRecord>, StoreError> {
        let since = Duration::try_hours(i64::from(hours))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| StoreError::InvalidRange(format!("{hours} hours is out of range")))?;
        self.query_range(since).await
    }

    /// Records whose town contains `town` (case-insensitive), newest first.
    /// `town` is matched literally; `%` and `_` are not wildcards.
    async fn by_town(
        &self,
        town: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LocationRecord>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<LocationRecord>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Short store label for logs.
    fn name(&self) -> &str;
}

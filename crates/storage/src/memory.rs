//! In-process record store used for dry runs and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use antiradar_core::{LocationRecord, NewLocationRecord, StoredRecord};

use crate::error::StoreError;
use crate::store::RecordStore;

#[derive(Default)]
struct Inner {
    records: Vec<LocationRecord>,
    fail_next: usize,
}

/// Keeps records in a `Vec`; ids start at 1.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<Inner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` appends fail without writing anything.
    pub fn fail_next(&self, n: usize) {
        self.lock().fail_next = n;
    }

    /// Snapshot of everything appended so far, in insertion order.
    pub fn records(&self) -> Vec<LocationRecord> {
        self.lock().records.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a panicking test thread; the data is intact.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn append(&self, record: &NewLocationRecord) -> Result<StoredRecord, StoreError> {
        let mut inner = self.lock();
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(StoreError::Rejected("scheduled failure".into()));
        }

        let id = inner.records.last().map_or(1, |r| r.id + 1);
        let now = Utc::now();
        let post_time = match inner.records.last() {
            Some(last) if last.post_time >= now => last.post_time + Duration::microseconds(1),
            _ => now,
        };
        let stored = StoredRecord { id, post_time };
        inner.records.push(LocationRecord::from_parts(stored, record));
        Ok(stored)
    }

    async fn query_range(&self, since: DateTime<Utc>) -> Result<Vec<LocationRecord>, StoreError> {
        Ok(self
            .lock()
            .records
            .iter()
            .filter(|r| r.post_time >= since)
            .cloned()
            .collect())
    }

    async fn by_town(
        &self,
        town: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LocationRecord>, StoreError> {
        let needle = town.to_lowercase();
        Ok(self
            .lock()
            .records
            .iter()
            .rev()
            .filter(|r| r.town.to_lowercase().contains(&needle))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<LocationRecord>, StoreError> {
        Ok(self.lock().records.iter().find(|r| r.id == id).cloned())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.lock().records.len() as i64)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

//! In-memory record store.

use std::collections::HashMap;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::ingest::IngestReport;
use crate::types::{is_usable_coordinate, GeoRecord, RecordFilter, RecordPatch};
use super::{RecordStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    /// Records in ingestion order.
    records: Vec<GeoRecord>,
    /// Id -> position in `records`.
    index: HashMap<String, usize>,
}

/// In-memory record store.
///
/// Built once from an ingestion result and shared behind an `Arc`. Reads take
/// a shared lock; updates take the write lock, so all updates are serialized.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Inner>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`, rejecting duplicate ids.
    pub fn from_records(records: Vec<GeoRecord>) -> Result<Self, StoreError> {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), pos).is_some() {
                return Err(StoreError::DuplicateId(record.id.clone()));
            }
        }
        Ok(Self {
            inner: RwLock::new(Inner { records, index }),
        })
    }

    /// Create a store from the accepted records of an ingestion run.
    pub fn from_report(report: IngestReport) -> Result<Self, StoreError> {
        Self::from_records(report.records)
    }

    /// Apply `mutate` to the record with `id` under the write lock.
    ///
    /// The change is rolled back if it leaves the record invalid.
    pub fn modify<F>(&self, id: &str, mutate: F) -> Result<GeoRecord, StoreError>
    where
        F: FnOnce(&mut GeoRecord),
    {
        let mut inner = self.inner.write();
        let pos = *inner
            .index
            .get(id)
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))?;

        let record = &mut inner.records[pos];
        let mut updated = record.clone();
        mutate(&mut updated);
        // Ids are never reassigned.
        updated.id = record.id.clone();

        if let Some(reason) = violation(&updated) {
            return Err(StoreError::InvalidUpdate {
                id: id.to_string(),
                reason: reason.to_string(),
            });
        }

        *record = updated.clone();
        Ok(updated)
    }
}

fn violation(record: &GeoRecord) -> Option<&'static str> {
    if record.rocks.is_empty() {
        Some("rock name must not be empty")
    } else if !is_usable_coordinate(record.latitude) {
        Some("latitude must be finite and non-zero")
    } else if !is_usable_coordinate(record.longitude) {
        Some("longitude must be finite and non-zero")
    } else {
        None
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn all(&self) -> Vec<GeoRecord> {
        self.inner.read().records.clone()
    }

    async fn get(&self, id: &str) -> Result<GeoRecord, StoreError> {
        let inner = self.inner.read();
        inner
            .index
            .get(id)
            .map(|&pos| inner.records[pos].clone())
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))
    }

    async fn search(&self, filter: &RecordFilter) -> Vec<GeoRecord> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<GeoRecord, StoreError> {
        self.modify(id, |record| patch.apply(record))
    }

    async fn len(&self) -> usize {
        self.inner.read().records.len()
    }
}

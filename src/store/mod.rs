//! Record storage backends.

pub mod memory;

use async_trait::async_trait;
use crate::types::{GeoRecord, RecordFilter, RecordPatch};

/// Error type for record store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// No record carries the requested id.
    #[error("record not found: {0}")]
    RecordNotFound(String),
    /// Two records share an id.
    #[error("duplicate record id: {0}")]
    DuplicateId(String),
    /// An update would leave the record invalid. The record is unchanged.
    #[error("invalid update for record {id}: {reason}")]
    InvalidUpdate {
        /// The record that was targeted.
        id: String,
        /// What would have been violated.
        reason: String,
    },
}

/// Trait for record storage backends.
///
/// The store owns its records: reads hand out copies and the only way to
/// change a record is [`RecordStore::update`]. Iteration order is ingestion
/// order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records.
    async fn all(&self) -> Vec<GeoRecord>;

    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<GeoRecord, StoreError>;

    /// Records matching a filter.
    async fn search(&self, filter: &RecordFilter) -> Vec<GeoRecord>;

    /// Apply an in-place change to one record and return the updated copy.
    ///
    /// Updates are serialized; concurrent updates to the same record never
    /// lose each other's changes.
    async fn update(&self, id: &str, patch: RecordPatch) -> Result<GeoRecord, StoreError>;

    /// Number of records.
    async fn len(&self) -> usize;

    /// Whether the store holds no records.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

pub use memory::InMemoryRecordStore;

//! # geogate
//!
//! Path-based access control over an external policy document, plus a
//! validated in-memory store of geolocated rock records.
//!
//! ## Architecture
//!
//! ```text
//! request ─> AccessGate ──> PolicyStore (XML, re-read per check)
//!               │
//!               └─> protected handler ─> RecordStore <─ DataIngestor <─ CSV
//!
//! QueryAPI (/records) ──────────────────> RecordStore
//! ```
//!
//! ## Guarantees
//!
//! - Deny by default: a missing, oversized or corrupt policy document never
//!   grants access
//! - Decisions are per top-level route: `/insert_rock/42` is judged as
//!   `/insert_rock`
//! - Only rows with a rock name and non-zero finite coordinates reach the
//!   store, in source order
//! - Record updates are serialized and re-validated

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod gate;
pub mod ingest;
pub mod store;
pub mod config;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{GeoRecord, LevelId, PathPrefix, RecordFilter, RecordPatch, UserIdentity};
pub use policy::{
    FilePolicyStore, InMemoryPolicyStore, LevelPolicy, PolicyDocument, PolicyError, PolicyStore,
};
pub use gate::{AccessGate, AuthorizationDecision, GateOutcome};
pub use ingest::{DataIngestor, IngestError, IngestReport, SkipReason, SkippedRow};
pub use store::{InMemoryRecordStore, RecordStore, StoreError};
pub use config::{ConfigError, LogFormat, ServiceConfig};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, AppState, ServiceState};

//! Service state management.
//!
//! Contains the shared record store, the access gate and the settings the
//! router needs. Everything is built once at start-up and handed to the
//! router; there is no ambient global state.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::gate::AccessGate;
use crate::ingest::IngestReport;
use crate::policy::{FilePolicyStore, PolicyStore};
use crate::store::RecordStore;

use super::identity::{HeaderIdentityResolver, IdentityResolver};

/// What the start-up ingestion produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Accepted records.
    pub accepted: usize,
    /// Skipped rows.
    pub skipped: usize,
    /// When ingestion finished.
    pub loaded_at: DateTime<Utc>,
}

impl IngestSummary {
    /// Summarize an ingestion report.
    pub fn from_report(report: &IngestReport) -> Self {
        Self {
            accepted: report.accepted_count(),
            skipped: report.skipped_count(),
            loaded_at: Utc::now(),
        }
    }

    /// Summary for a store that was not populated from a dataset.
    pub fn empty() -> Self {
        Self {
            accepted: 0,
            skipped: 0,
            loaded_at: Utc::now(),
        }
    }
}

/// Shared service state.
pub struct ServiceState<S: RecordStore + 'static> {
    /// The record store behind the query API and update routes.
    pub store: Arc<S>,
    /// Gate in front of protected routes.
    pub gate: AccessGate,
    /// Resolves the caller of each request.
    pub identity: Arc<dyn IdentityResolver>,
    /// Redirect target for unauthenticated callers.
    pub login_path: String,
    /// Whether the record query routes bypass the gate.
    pub public_records: bool,
    ingest: IngestSummary,
}

impl<S: RecordStore + 'static> ServiceState<S> {
    /// Create state with header-based identities, `/login` redirects and a
    /// public record surface.
    pub fn new(store: S, policy: Arc<dyn PolicyStore>) -> Self {
        Self {
            store: Arc::new(store),
            gate: AccessGate::new(policy),
            identity: Arc::new(HeaderIdentityResolver),
            login_path: "/login".to_string(),
            public_records: true,
            ingest: IngestSummary::empty(),
        }
    }

    /// Create state from configuration, using a file-backed policy store.
    pub fn from_config(store: S, config: &ServiceConfig) -> Self {
        let policy = FilePolicyStore::with_max_bytes(&config.policy_path, config.policy_max_bytes);
        Self::new(store, Arc::new(policy))
            .with_login_path(config.login_path.clone())
            .with_public_records(config.public_records)
    }

    /// Replace the identity resolver.
    pub fn with_identity_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.identity = resolver;
        self
    }

    /// Set the login redirect target.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Choose whether record queries bypass the gate.
    pub fn with_public_records(mut self, public: bool) -> Self {
        self.public_records = public;
        self
    }

    /// Record the start-up ingestion result.
    pub fn with_ingest_summary(mut self, summary: IngestSummary) -> Self {
        self.ingest = summary;
        self
    }

    /// The start-up ingestion result.
    pub fn ingest_summary(&self) -> &IngestSummary {
        &self.ingest
    }
}

impl<S: RecordStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            gate: self.gate.clone(),
            identity: Arc::clone(&self.identity),
            login_path: self.login_path.clone(),
            public_records: self.public_records,
            ingest: self.ingest.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::DataIngestor;
    use crate::store::InMemoryRecordStore;

    #[test]
    fn test_from_config_carries_settings() {
        let config = ServiceConfig {
            login_path: "/signin".to_string(),
            public_records: false,
            ..ServiceConfig::default()
        };
        let state = ServiceState::from_config(InMemoryRecordStore::new(), &config);
        assert_eq!(state.login_path, "/signin");
        assert!(!state.public_records);
    }

    #[test]
    fn test_ingest_summary_counts() {
        let report = DataIngestor::new()
            .ingest("id,place,rocks,latitude,longitude\n1,A,Slate,1,1\n2,B,,1,1\n".as_bytes())
            .unwrap();
        let summary = IngestSummary::from_report(&report);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.skipped, 1);
    }
}

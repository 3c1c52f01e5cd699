//! Authorization policy: document model and policy stores.
//!
//! The policy document is external, always-current state. Stores re-read and
//! re-parse it on every check, so edits take effect on the next request
//! without a restart. Any failure to obtain a well-formed document is reported
//! as a [`PolicyError`]; callers must treat that as a denial.

pub mod document;
pub mod store;

pub use document::{LevelPolicy, PolicyDocument};
pub use store::{FilePolicyStore, InMemoryPolicyStore, PolicyStore, DEFAULT_POLICY_MAX_BYTES};

/// The policy document could not be used (the `PolicyUnavailable` condition).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Document missing or unreadable.
    #[error("policy document unavailable ({source_name}): {reason}")]
    Unavailable {
        /// Where the document was expected.
        source_name: String,
        /// Underlying cause.
        reason: String,
    },
    /// Document exceeds the configured size cap and was not parsed.
    #[error("policy document is larger than {limit} bytes")]
    TooLarge {
        /// The configured cap.
        limit: u64,
    },
    /// Document could not be parsed or violates the document invariants.
    #[error("malformed policy document: {0}")]
    Malformed(String),
}

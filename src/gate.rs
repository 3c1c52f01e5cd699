//! Access gate: per-request authorization decisions.
//!
//! ## Decision flow
//!
//! ```text
//! identity? ──no──> Unauthenticated (redirect to login)
//!    │
//! level? ────no──> Unauthenticated
//!    │
//! base path = first segment of the request path
//!    │
//! PolicyStore::is_allowed(level, base)
//!    ├─ Ok(true)  -> Granted
//!    ├─ Ok(false) -> Denied
//!    └─ Err(_)    -> PolicyUnavailable (denied)
//! ```
//!
//! Every decision is logged on the `geogate::audit` target.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::policy::{PolicyError, PolicyStore};
use crate::types::{LevelId, PathPrefix, UserIdentity};

/// Derived authorization decision for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    /// Whether access is granted.
    pub granted: bool,
    /// Level the decision was made for.
    pub level: LevelId,
    /// Base path the decision applies to.
    pub base_path: PathPrefix,
}

/// Result of running a request through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// No identity, or an identity without a level. Not an error state.
    Unauthenticated,
    /// The policy allows the base path for the caller's level.
    Granted(AuthorizationDecision),
    /// The policy does not allow the base path.
    Denied(AuthorizationDecision),
    /// The policy could not be loaded. Always a denial.
    PolicyUnavailable {
        /// The denied decision.
        decision: AuthorizationDecision,
        /// Why the policy was unavailable.
        error: PolicyError,
    },
}

impl GateOutcome {
    /// Whether the request may proceed to the protected handler.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// The decision, when one was made.
    pub fn decision(&self) -> Option<&AuthorizationDecision> {
        match self {
            Self::Unauthenticated => None,
            Self::Granted(d) | Self::Denied(d) => Some(d),
            Self::PolicyUnavailable { decision, .. } => Some(decision),
        }
    }

    /// Short label used in audit logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Granted(_) => "granted",
            Self::Denied(_) => "denied",
            Self::PolicyUnavailable { .. } => "policy_unavailable",
        }
    }
}

/// Gate in front of protected routes.
#[derive(Clone)]
pub struct AccessGate {
    policy: Arc<dyn PolicyStore>,
}

impl AccessGate {
    /// Create a gate over a policy store.
    pub fn new(policy: Arc<dyn PolicyStore>) -> Self {
        Self { policy }
    }

    /// The underlying policy store.
    pub fn policy(&self) -> &Arc<dyn PolicyStore> {
        &self.policy
    }

    /// Decide whether `identity` may access `request_path`.
    pub fn check(&self, identity: Option<&UserIdentity>, request_path: &str) -> GateOutcome {
        let base_path = PathPrefix::base_of(request_path);

        let Some(level) = identity.and_then(|id| id.level) else {
            info!(
                target: "geogate::audit",
                level = "none",
                full_path = %request_path,
                base_path = %base_path,
                outcome = "unauthenticated",
                "access check"
            );
            return GateOutcome::Unauthenticated;
        };

        let outcome = match self.policy.is_allowed(level, &base_path) {
            Ok(granted) => {
                let decision = AuthorizationDecision { granted, level, base_path };
                if granted {
                    GateOutcome::Granted(decision)
                } else {
                    GateOutcome::Denied(decision)
                }
            }
            Err(error) => GateOutcome::PolicyUnavailable {
                decision: AuthorizationDecision { granted: false, level, base_path },
                error,
            },
        };

        audit(&outcome, level, request_path);
        outcome
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

fn audit(outcome: &GateOutcome, level: LevelId, full_path: &str) {
    let base_path = outcome
        .decision()
        .map(|d| d.base_path.as_str())
        .unwrap_or("/");

    match outcome {
        GateOutcome::Granted(_) => info!(
            target: "geogate::audit",
            level = level.get(),
            full_path = %full_path,
            base_path = %base_path,
            outcome = outcome.label(),
            "access check"
        ),
        GateOutcome::Denied(_) => warn!(
            target: "geogate::audit",
            level = level.get(),
            full_path = %full_path,
            base_path = %base_path,
            outcome = outcome.label(),
            "access check"
        ),
        GateOutcome::PolicyUnavailable { error, .. } => error!(
            target: "geogate::audit",
            level = level.get(),
            full_path = %full_path,
            base_path = %base_path,
            outcome = outcome.label(),
            error = %error,
            "access check failed: policy configuration error"
        ),
        GateOutcome::Unauthenticated => {}
    }
}

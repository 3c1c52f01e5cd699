//! Service middleware: the access gate and request metrics.
//!
//! ## Metrics Exposed
//!
//! - `request` - method, normalized path, status, latency per request
//!
//! Metrics go to the `geogate::metrics` tracing target and can be aggregated
//! from logs.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use regex_lite::Regex;
use tracing::info;

use crate::gate::GateOutcome;

use super::routes::{AppState, ErrorResponse};

/// Access gate middleware for protected routes.
///
/// Runs before handler dispatch. Granted requests continue with the caller's
/// [`UserIdentity`](crate::types::UserIdentity) and
/// [`AuthorizationDecision`](crate::gate::AuthorizationDecision) attached as
/// request extensions. Anonymous callers are redirected to the login path;
/// denials and policy failures both answer 403 without policy details.
pub async fn access_gate_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = state.identity.resolve(request.headers());
    let outcome = state.gate.check(identity.as_ref(), request.uri().path());

    match outcome {
        GateOutcome::Granted(decision) => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }
            request.extensions_mut().insert(decision);
            next.run(request).await
        }
        GateOutcome::Unauthenticated => Redirect::to(&state.login_path).into_response(),
        GateOutcome::Denied(_) => ErrorResponse::forbidden().into_response(),
        GateOutcome::PolicyUnavailable { .. } => ErrorResponse::policy_unavailable().into_response(),
    }
}

/// Metrics middleware that records request counts and latency.
pub async fn request_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "geogate::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Header carrying a caller-supplied correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id for a request.
///
/// Uses the `x-request-id` header when it holds a short printable ASCII
/// value, otherwise a fresh UUID.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Replaces UUIDs and purely numeric segments with `:id`.
fn normalize_path(path: &str) -> String {
    static ID_SEGMENT: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = ID_SEGMENT.get_or_init(|| {
        Regex::new(r"/(?:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}|[0-9]+)(/|$)").ok()
    });

    match regex {
        Some(re) => {
            // Adjacent id segments share a separator, so apply until stable.
            let mut current = path.to_string();
            loop {
                let next = re.replace_all(&current, "/:id$1").to_string();
                if next == current {
                    return current;
                }
                current = next;
            }
        }
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_id(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_request_id_from_header() {
        assert_eq!(request_id(&headers_with_id(" abc-123 ")), "abc-123");
    }

    #[test]
    fn test_request_id_ignores_cloud_trace_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-cloud-trace-context", "105445aa7843bc8bf206b12000100000/1".parse().unwrap());
        let id = request_id(&headers);
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_request_id_falls_back_on_unusable_values() {
        for value in ["", "has space", &"x".repeat(MAX_REQUEST_ID_LEN + 1)] {
            let id = request_id(&headers_with_id(value));
            assert!(uuid::Uuid::parse_str(&id).is_ok(), "value {value:?} gave {id}");
        }
    }

    #[test]
    fn test_normalize_path_replaces_numeric_id() {
        assert_eq!(normalize_path("/records/42"), "/records/:id");
        assert_eq!(normalize_path("/update_rock/7/"), "/update_rock/:id/");
    }

    #[test]
    fn test_normalize_path_replaces_uuid() {
        let path = "/records/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/records/:id");
    }

    #[test]
    fn test_normalize_path_adjacent_ids() {
        assert_eq!(normalize_path("/a/1/2"), "/a/:id/:id");
    }

    #[test]
    fn test_normalize_path_preserves_regular_path() {
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
        assert_eq!(normalize_path("/records/r42"), "/records/r42");
    }
}

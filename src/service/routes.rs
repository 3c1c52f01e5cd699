//! Axum routes for the geogate service.

use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::gate::AuthorizationDecision;
use crate::store::{InMemoryRecordStore, RecordStore, StoreError};
use crate::types::{GeoRecord, LevelId, RecordFilter, RecordPatch, UserIdentity};

use super::middleware::{access_gate_middleware, request_metrics_middleware};
use super::state::{IngestSummary, ServiceState};

/// Fixed readiness detail; the underlying error is logged, not returned.
const POLICY_UNAVAILABLE_DETAIL: &str = "policy unavailable";

/// Type alias for the service state with InMemoryRecordStore.
pub type AppState = ServiceState<InMemoryRecordStore>;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Rename a rock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRockRequest {
    /// New rock name.
    pub rocks: String,
}

/// Move a record to a new place and coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLocationRequest {
    /// New place name.
    pub place: String,
    /// New latitude.
    pub latitude: f64,
    /// New longitude.
    pub longitude: f64,
}

/// Caller summary for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub subject: String,
    pub level: LevelId,
    pub record_count: usize,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub record_count: usize,
    pub ingest: IngestSummary,
    pub policy_available: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub policy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Structured error response.
///
/// Never carries policy contents.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl ErrorResponse {
    /// Create a new error response with status, code and message.
    pub fn new(status: StatusCode, code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
            status,
        }
    }

    /// Valid identity, but the policy does not allow the route.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", "Access denied: insufficient privilege")
    }

    /// The policy document could not be loaded; the request is denied.
    pub fn policy_unavailable() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "POLICY_UNAVAILABLE",
            "Access denied: access control configuration unavailable",
        )
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StoreError> for ErrorResponse {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordNotFound(id) => {
                Self::new(StatusCode::NOT_FOUND, "RECORD_NOT_FOUND", "Record not found").with_details(id)
            }
            StoreError::InvalidUpdate { reason, .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_UPDATE", "Update rejected")
                    .with_details(reason)
            }
            StoreError::DuplicateId(id) => {
                Self::new(StatusCode::CONFLICT, "DUPLICATE_ID", "Duplicate record id").with_details(id)
            }
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(
            status = self.status.as_u16(),
            code = %self.code,
            error = %self.error,
            "Request error"
        );
        (self.status, Json(self)).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// List records, optionally filtered by rock name or place.
async fn list_records_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RecordFilter>,
) -> Json<Vec<GeoRecord>> {
    if filter.is_unconstrained() {
        Json(state.store.all().await)
    } else {
        Json(state.store.search(&filter).await)
    }
}

/// Fetch one record by id.
async fn get_record_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GeoRecord>, ErrorResponse> {
    Ok(Json(state.store.get(&id).await?))
}

/// Caller identity and level.
async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Extension(decision): Extension<AuthorizationDecision>,
) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        subject: identity.subject,
        level: decision.level,
        record_count: state.store.len().await,
    })
}

/// All records as a GeoJSON FeatureCollection for the map view.
async fn map_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let features: Vec<Value> = state
        .store
        .all()
        .await
        .into_iter()
        .map(|r| {
            json!({
                "type": "Feature",
                "id": r.id,
                "geometry": {
                    "type": "Point",
                    "coordinates": [r.longitude, r.latitude],
                },
                "properties": {
                    "Place": r.place,
                    "Rocks": r.rocks,
                },
            })
        })
        .collect();

    Json(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

/// Rename the rock of an existing record.
async fn update_rock_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRockRequest>,
) -> Result<Json<GeoRecord>, ErrorResponse> {
    let updated = state.store.update(&id, RecordPatch::rename(request.rocks)).await?;
    Ok(Json(updated))
}

/// Move an existing record.
async fn update_location_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<GeoRecord>, ErrorResponse> {
    let patch = RecordPatch::relocate(request.place, request.latitude, request.longitude);
    let updated = state.store.update(&id, patch).await?;
    Ok(Json(updated))
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let policy_available = state.gate.policy().load().is_ok();

    Json(HealthResponse {
        status: if policy_available { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        record_count: state.store.len().await,
        ingest: state.ingest_summary().clone(),
        policy_available,
    })
}

/// Liveness probe endpoint.
///
/// Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 503 while the policy document cannot be loaded, since every gated
/// request would be denied.
async fn readiness_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    match state.gate.policy().load() {
        Ok(_) => Ok(Json(ReadinessResponse {
            ready: true,
            policy: true,
            details: None,
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed: policy unavailable");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    policy: false,
                    details: Some(POLICY_UNAVAILABLE_DETAIL.to_string()),
                }),
            ))
        }
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the geogate service.
///
/// Gated routes run [`access_gate_middleware`] before dispatch. The record
/// query routes are public unless the state says otherwise, in which case
/// they are gated under the `/records` base path.
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let gated = Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/map", get(map_handler))
        .route("/update_rock/:id", post(update_rock_handler))
        .route("/update_location/:id", post(update_location_handler));

    let records = Router::new()
        .route("/records", get(list_records_handler))
        .route("/records/:id", get(get_record_handler));

    let (gated, public) = if state.public_records {
        (gated, records)
    } else {
        (gated.merge(records), Router::new())
    };

    let gated = gated.route_layer(middleware::from_fn_with_state(
        Arc::clone(&state),
        access_gate_middleware,
    ));

    Router::new()
        .merge(gated)
        .merge(public)
        // Health checks
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .layer(middleware::from_fn(request_metrics_middleware))
        .with_state(state)
}

//! geogate REST service
//!
//! ## Endpoints
//!
//! Public:
//! - `GET /records` - All records (`?rock=` / `?place=` substring filters)
//! - `GET /records/:id` - One record
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//!
//! Gated (access gate runs first):
//! - `GET /dashboard` - Caller identity and level
//! - `GET /map` - Records as GeoJSON
//! - `POST /update_rock/:id` - Rename a rock
//! - `POST /update_location/:id` - Move a record

pub mod identity;
pub mod middleware;
pub mod routes;
pub mod state;

pub use identity::{HeaderIdentityResolver, IdentityResolver, LEVEL_HEADER, USER_HEADER};
pub use middleware::{
    access_gate_middleware, request_id, request_metrics_middleware, REQUEST_ID_HEADER,
};
pub use routes::{create_router, AppState, ErrorResponse};
pub use state::{IngestSummary, ServiceState};

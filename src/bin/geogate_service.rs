//! geogate Service Binary
//!
//! Runs the access gate and record query API as a REST service:
//! - Structured JSON logging
//! - Request spans keyed by `x-request-id` (or a fresh UUID)
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! See [`geogate::config`] for the full list. The most common ones:
//! - `GEOGATE_POLICY_PATH`: policy XML (default: user_access.xml)
//! - `GEOGATE_DATASET_PATH`: rock dataset CSV (default: static/map_page/rock_info1.csv)
//! - `PORT`: Service port (default: 5000)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! GEOGATE_POLICY_PATH=user_access.xml cargo run --bin geogate_service --features service
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use geogate::service::{create_router, request_id, IngestSummary, ServiceState, REQUEST_ID_HEADER};
use geogate::{DataIngestor, InMemoryRecordStore, IngestReport, LogFormat, ServiceConfig};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "geogate=info,geogate_service=info,tower_http=info".into());

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true)
                )
                .init();
        }
    }
}

/// Wraps each request in a span carrying its correlation id and echoes the
/// id back. The per-request summary line comes from the metrics middleware.
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let mut response = next.run(request).instrument(span.clone()).await;

    span.record("status", response.status().as_u16());
    span.record("latency_ms", start.elapsed().as_millis() as u64);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env()?;
    init_tracing(config.log_format);

    let version = env!("CARGO_PKG_VERSION");
    info!(version = version, "Starting geogate service");

    // Ingest once, before accepting traffic. A missing dataset leaves the
    // store empty rather than failing start-up.
    let ingestor = DataIngestor::new().with_delimiter(config.dataset_delimiter);
    let report = match ingestor.ingest_path(&config.dataset_path) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Dataset ingestion failed; starting with an empty record store");
            IngestReport::default()
        }
    };
    let summary = IngestSummary::from_report(&report);
    info!(
        accepted = summary.accepted,
        skipped = summary.skipped,
        "Record store populated"
    );

    let store = InMemoryRecordStore::from_report(report)?;
    let state = ServiceState::from_config(store, &config).with_ingest_summary(summary);

    match state.gate.policy().load() {
        Ok(doc) => info!(
            path = %config.policy_path.display(),
            levels = doc.levels().len(),
            "Policy document loaded"
        ),
        Err(e) => warn!(
            path = %config.policy_path.display(),
            error = %e,
            "Policy document unavailable; gated routes will deny until it is fixed"
        ),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!(address = %addr, version = version, "geogate service listening");

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("geogate service shutdown complete");

    Ok(())
}

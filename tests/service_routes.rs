//! Router-level tests for the HTTP surface.
//!
//! Requires the `service` feature: `cargo test --features service`.

#![cfg(feature = "service")]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use geogate::service::{create_router, ServiceState, LEVEL_HEADER, USER_HEADER};
use geogate::{DataIngestor, GeoRecord, InMemoryPolicyStore, InMemoryRecordStore};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

const POLICY: &str = r#"
<AccessControl>
  <Level id="1">
    <Page>/dashboard</Page>
    <Page>/map</Page>
    <Page>/update_rock</Page>
    <Page>/update_location</Page>
    <Page>/records</Page>
  </Level>
  <Level id="2">
    <Page>/dashboard</Page>
    <Page>/map</Page>
  </Level>
</AccessControl>"#;

const DATASET: &str = "id,place,rocks,latitude,longitude
5,Quarry,Granite,0,12.3
6,Ridge,Basalt,40.1,-3.7
7,Tor,Dolerite,50.57,-3.92
";

fn app_with(policy: Arc<InMemoryPolicyStore>, public_records: bool) -> Router {
    let report = DataIngestor::new().ingest(DATASET.as_bytes()).unwrap();
    let store = InMemoryRecordStore::from_report(report).unwrap();
    let state = ServiceState::new(store, policy).with_public_records(public_records);
    create_router(state)
}

fn app() -> Router {
    app_with(Arc::new(InMemoryPolicyStore::new(POLICY)), true)
}

fn get(uri: &str, level: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(level) = level {
        builder = builder
            .header(USER_HEADER, "geo@example.com")
            .header(LEVEL_HEADER, level);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, level: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(USER_HEADER, "geo@example.com")
        .header(LEVEL_HEADER, level)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Query API
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_records_is_public_and_ordered() {
    let response = app().oneshot(get("/records", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(
        body,
        json!([
            {"Id": "6", "Place": "Ridge", "Rocks": "Basalt", "Latitude": 40.1, "Longitude": -3.7},
            {"Id": "7", "Place": "Tor", "Rocks": "Dolerite", "Latitude": 50.57, "Longitude": -3.92},
        ])
    );
}

#[tokio::test]
async fn get_one_record_and_not_found() {
    let response = app().oneshot(get("/records/6", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record: GeoRecord = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(record, GeoRecord::new("6", "Ridge", "Basalt", 40.1, -3.7));

    let response = app().oneshot(get("/records/5", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "RECORD_NOT_FOUND");
}

#[tokio::test]
async fn search_filters_by_rock_and_place() {
    let response = app().oneshot(get("/records?rock=basa", None)).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["Id"], "6");

    let response = app().oneshot(get("/records?place=", None)).await.unwrap();
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn records_can_be_gated() {
    let app = app_with(Arc::new(InMemoryPolicyStore::new(POLICY)), false);

    let response = app.clone().oneshot(get("/records", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.clone().oneshot(get("/records", Some("2"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.oneshot(get("/records/6", Some("1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ─────────────────────────────────────────────────────────────────────────────
// Access gate
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn anonymous_caller_is_redirected_to_login() {
    let response = app().oneshot(get("/dashboard", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn caller_without_level_is_redirected() {
    let request = Request::builder()
        .uri("/dashboard")
        .header(USER_HEADER, "geo@example.com")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn dashboard_reports_identity() {
    let response = app().oneshot(get("/dashboard", Some("2"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["subject"], "geo@example.com");
    assert_eq!(body["level"], 2);
    assert_eq!(body["record_count"], 2);
}

#[tokio::test]
async fn insufficient_level_is_forbidden_without_policy_details() {
    let response = app()
        .oneshot(post_json("/update_rock/6", "2", json!({"rocks": "Gabbro"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["code"], "FORBIDDEN");
    assert!(!body.to_string().contains("/dashboard"));
}

#[tokio::test]
async fn missing_policy_is_forbidden() {
    let app = app_with(Arc::new(InMemoryPolicyStore::empty()), true);
    let response = app.oneshot(get("/dashboard", Some("1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "POLICY_UNAVAILABLE");
}

#[tokio::test]
async fn map_returns_geojson() {
    let response = app().oneshot(get("/map", Some("2"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"][0]["geometry"]["coordinates"], json!([-3.7, 40.1]));
    assert_eq!(body["features"][1]["properties"]["Rocks"], "Dolerite");
}

// ─────────────────────────────────────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_rock_then_read_back() {
    let app = app();
    let response = app
        .clone()
        .oneshot(post_json("/update_rock/6", "1", json!({"rocks": "Gabbro"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["Rocks"], "Gabbro");

    let response = app.oneshot(get("/records/6", None)).await.unwrap();
    assert_eq!(json_body(response).await["Rocks"], "Gabbro");
}

#[tokio::test]
async fn update_location_validates_coordinates() {
    let app = app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/update_location/7",
            "1",
            json!({"place": "Moor", "latitude": 0.0, "longitude": -3.9}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["code"], "INVALID_UPDATE");

    let response = app
        .clone()
        .oneshot(post_json(
            "/update_location/7",
            "1",
            json!({"place": "Moor", "latitude": 50.6, "longitude": -3.9}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/records/7", None)).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["Place"], "Moor");
    assert_eq!(body["Latitude"], 50.6);
}

#[tokio::test]
async fn update_unknown_record_is_not_found() {
    let response = app()
        .oneshot(post_json("/update_rock/99", "1", json!({"rocks": "Gabbro"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn readiness_tracks_policy_availability() {
    let policy = Arc::new(InMemoryPolicyStore::new(POLICY));
    let app = app_with(Arc::clone(&policy), true);

    let response = app.clone().oneshot(get("/health/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    policy.clear();
    let response = app.clone().oneshot(get("/health/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["ready"], false);
    assert_eq!(body["details"], "policy unavailable");

    let response = app.oneshot(get("/health", None)).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["record_count"], 2);
}

#[tokio::test]
async fn readiness_does_not_expose_policy_location() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("secret_dir").join("user_access.xml");
    let policy = Arc::new(geogate::FilePolicyStore::new(missing.clone()));
    let report = DataIngestor::new().ingest(DATASET.as_bytes()).unwrap();
    let store = InMemoryRecordStore::from_report(report).unwrap();
    let app = create_router(ServiceState::new(store, policy));

    let response = app.oneshot(get("/health/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let text = json_body(response).await.to_string();
    assert!(!text.contains("secret_dir"));
    assert!(!text.contains("user_access.xml"));
}

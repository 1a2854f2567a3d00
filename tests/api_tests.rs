//! Integration tests for the earshot HTTP API

use axum::body::Body;
use axum::http::{Request, StatusCode};
use earshot::api::{build_router, AppState};
use earshot::detect::debounce::{Debouncer, LOOKBACK_US};
use earshot::publish::Publisher;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`

/// Test helper: router over a fresh in-memory database
async fn setup_app() -> axum::Router {
    let pool = earshot::db::init::init_memory()
        .await
        .expect("in-memory database");
    let publisher = Arc::new(Publisher::new());
    let (debouncer, _windows) = Debouncer::new(Duration::from_millis(10), LOOKBACK_US);
    build_router(AppState::new(pool, publisher, debouncer))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("should read body");
    serde_json::from_slice(&bytes).expect("should parse JSON")
}

fn report_body(sensor_id: i64, timestamp: i64) -> Value {
    json!({
        "sensor_id": sensor_id,
        "timestamp": timestamp,
        "lat": 42.0,
        "lon": -83.0,
    })
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = setup_app().await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "earshot");
}

#[tokio::test]
async fn submitting_a_report_stores_it() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/reports", report_body(1, 1_000_000)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "accepted");

    let response = app.oneshot(get("/reports")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["sensor_id"], 1);
}

#[tokio::test]
async fn duplicate_submission_is_reported_and_stored_once() {
    let app = setup_app().await;

    let first = app
        .clone()
        .oneshot(post_json("/reports", report_body(1, 1_000_000)))
        .await
        .unwrap();
    assert_eq!(extract_json(first.into_body()).await["status"], "accepted");

    let second = app
        .clone()
        .oneshot(post_json("/reports", report_body(1, 1_000_000)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        extract_json(second.into_body()).await["status"],
        "duplicate"
    );

    let listing = app.oneshot(get("/reports")).await.unwrap();
    let body = extract_json(listing.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_coordinates_are_rejected() {
    let app = setup_app().await;

    let bad_lat = json!({"sensor_id": 1, "timestamp": 1_000_000, "lat": 91.0, "lon": 0.0});
    let response = app.clone().oneshot(post_json("/reports", bad_lat)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_lon = json!({"sensor_id": 1, "timestamp": 1_000_000, "lat": 0.0, "lon": -181.0});
    let response = app.clone().oneshot(post_json("/reports", bad_lon)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Rejected submissions mutate nothing
    let listing = app.oneshot(get("/reports")).await.unwrap();
    let body = extract_json(listing.into_body()).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_timestamps_are_rejected() {
    let app = setup_app().await;

    let zero = report_body(1, 0);
    let response = app.clone().oneshot(post_json("/reports", zero)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let far_future = chrono::Utc::now().timestamp_micros() + 2 * 365 * 24 * 3600 * 1_000_000;
    let response = app
        .clone()
        .oneshot(post_json("/reports", report_body(1, far_future)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sensors_listing_reflects_the_registry() {
    let app = setup_app().await;

    app.clone()
        .oneshot(post_json("/reports", report_body(7, 1_000_000)))
        .await
        .unwrap();

    let response = app.oneshot(get("/sensors")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["sensor_id"], 7);
}

#[tokio::test]
async fn events_listing_starts_empty() {
    let app = setup_app().await;
    let response = app.oneshot(get("/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_burst_seeds_four_reports() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/test/burst")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sensor_ids"].as_array().unwrap().len(), 4);
    let base_lat = body["base_location"]["lat"].as_f64().unwrap();
    assert!((41.6..=45.0).contains(&base_lat));

    let listing = app.oneshot(get("/reports")).await.unwrap();
    let reports = extract_json(listing.into_body()).await;
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 4);

    // All four share one timestamp and sit near the base position
    let timestamp = body["timestamp"].as_i64().unwrap();
    for report in reports {
        assert_eq!(report["timestamp"].as_i64().unwrap(), timestamp);
        assert!((report["lat"].as_f64().unwrap() - base_lat).abs() < 0.01);
    }
}

#[tokio::test]
async fn clear_all_removes_everything() {
    let app = setup_app().await;

    app.clone()
        .oneshot(post_json("/reports", report_body(1, 1_000_000)))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/data")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reports = extract_json(
        app.clone()
            .oneshot(get("/reports"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert!(reports.as_array().unwrap().is_empty());

    let sensors = extract_json(app.oneshot(get("/sensors")).await.unwrap().into_body()).await;
    assert!(sensors.as_array().unwrap().is_empty());
}

//! HTTP API: ingest, listings, push channel

pub mod handlers;
pub mod ws;

use crate::detect::debounce::Debouncer;
use crate::publish::Publisher;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub publisher: Arc<Publisher>,
    pub debouncer: Debouncer,
}

impl AppState {
    pub fn new(db: SqlitePool, publisher: Arc<Publisher>, debouncer: Debouncer) -> Self {
        Self {
            db,
            publisher,
            debouncer,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reports", post(handlers::submit_report))
        .route("/reports", get(handlers::list_reports))
        .route("/events", get(handlers::list_events))
        .route("/sensors", get(handlers::list_sensors))
        .route("/data", delete(handlers::clear_all))
        .route("/test/burst", post(handlers::generate_test_burst))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Health check endpoint
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "earshot",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

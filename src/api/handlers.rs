//! HTTP request handlers

use super::AppState;
use crate::db::{self, reports::InsertOutcome, LocalizedEvent, Sensor, SensorReport};
use crate::error::{Error, Result};
use crate::events::PushMessage;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Accepted timestamps reach at most one year into the future
const MAX_FUTURE_US: i64 = 365 * 24 * 60 * 60 * 1_000_000;

#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    pub sensor_id: i64,
    /// Microseconds since the Unix epoch
    pub timestamp: i64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct SubmitReportResponse {
    status: &'static str,
}

/// POST /reports - ingest one arrival report
///
/// Persists the report, updates the sensor registry (publishing a snapshot
/// on significant movement) and signals the debounce coordinator. A
/// duplicate (sensor_id, timestamp) is an idempotent no-op.
pub async fn submit_report(
    State(state): State<AppState>,
    Json(req): Json<SubmitReportRequest>,
) -> Result<Json<SubmitReportResponse>> {
    validate(&req)?;

    let report = SensorReport {
        sensor_id: req.sensor_id,
        timestamp: req.timestamp,
        lat: req.lat,
        lon: req.lon,
    };

    if db::reports::insert_report(&state.db, &report).await? == InsertOutcome::Duplicate {
        info!(
            "duplicate report from sensor {} at {}",
            req.sensor_id, req.timestamp
        );
        return Ok(Json(SubmitReportResponse { status: "duplicate" }));
    }

    let registry_changed =
        db::sensors::observe_position(&state.db, req.sensor_id, req.lat, req.lon).await?;
    if registry_changed {
        let db = state.db.clone();
        let publisher = state.publisher.clone();
        tokio::spawn(async move {
            match db::sensors::snapshot(&db).await {
                Ok(sensors) => publisher.publish(&PushMessage::SensorUpdate { sensors }),
                Err(e) => warn!("registry snapshot for push failed: {}", e),
            }
        });
    }

    state.debouncer.signal(req.timestamp);

    Ok(Json(SubmitReportResponse { status: "accepted" }))
}

fn validate(req: &SubmitReportRequest) -> Result<()> {
    if !(-90.0..=90.0).contains(&req.lat) {
        return Err(Error::InvalidInput(format!("invalid latitude: {}", req.lat)));
    }
    if !(-180.0..=180.0).contains(&req.lon) {
        return Err(Error::InvalidInput(format!(
            "invalid longitude: {}",
            req.lon
        )));
    }
    let now_us = chrono::Utc::now().timestamp_micros();
    if req.timestamp <= 0 || req.timestamp > now_us + MAX_FUTURE_US {
        return Err(Error::InvalidInput(format!(
            "invalid timestamp: {}",
            req.timestamp
        )));
    }
    Ok(())
}

/// GET /reports - all stored reports, ascending by time
pub async fn list_reports(State(state): State<AppState>) -> Result<Json<Vec<SensorReport>>> {
    Ok(Json(db::reports::all_reports(&state.db).await?))
}

/// GET /events - all localized events, descending by time
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<LocalizedEvent>>> {
    Ok(Json(db::events::all_events(&state.db).await?))
}

/// GET /sensors - current registry snapshot
pub async fn list_sensors(State(state): State<AppState>) -> Result<Json<Vec<Sensor>>> {
    Ok(Json(db::sensors::snapshot(&state.db).await?))
}

#[derive(Debug, Serialize)]
pub struct TestBurstResponse {
    message: &'static str,
    base_location: BaseLocation,
    timestamp: i64,
    sensor_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BaseLocation {
    lat: f64,
    lon: f64,
}

/// POST /test/burst - insert a synthetic 4-sensor burst (dev tooling)
///
/// Seeds storage with four reports at a shared timestamp, offset up to
/// 60 m around a random base position. Reports are inserted directly;
/// no registry update or sweep is signaled.
pub async fn generate_test_burst(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TestBurstResponse>)> {
    let timestamp = chrono::Utc::now().timestamp_micros();

    // ThreadRng is not Send; finish all sampling before the first await
    let (base_lat, base_lon, positions) = {
        let mut rng = rand::thread_rng();
        let base_lat = rng.gen_range(41.6..45.0);
        let base_lon = rng.gen_range(-87.0..-83.0);
        let positions: Vec<(f64, f64)> = (0..4)
            .map(|_| offset_position(&mut rng, base_lat, base_lon, 60.0))
            .collect();
        (base_lat, base_lon, positions)
    };

    let mut sensor_ids = Vec::with_capacity(positions.len());
    for (i, (lat, lon)) in positions.into_iter().enumerate() {
        let sensor_id = 100 + i as i64;
        let report = SensorReport {
            sensor_id,
            timestamp,
            lat,
            lon,
        };
        db::reports::insert_report(&state.db, &report).await?;
        sensor_ids.push(sensor_id);
    }

    Ok((
        StatusCode::CREATED,
        Json(TestBurstResponse {
            message: "4 synthetic reports inserted",
            base_location: BaseLocation {
                lat: base_lat,
                lon: base_lon,
            },
            timestamp,
            sensor_ids,
        }),
    ))
}

/// Random position within `max_distance_m` of (lat, lon)
fn offset_position(rng: &mut impl Rng, lat: f64, lon: f64, max_distance_m: f64) -> (f64, f64) {
    let angle = rng.gen_range(0.0..std::f64::consts::TAU);
    let distance = rng.gen_range(0.0..max_distance_m);

    let delta_lat = distance * angle.cos() / 111_320.0;
    let delta_lon = distance * angle.sin() / (40_075_000.0 * lat.to_radians().cos() / 360.0);

    (lat + delta_lat, lon + delta_lon)
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    message: &'static str,
}

/// DELETE /data - remove all events, sensors and reports
pub async fn clear_all(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    db::clear_all(&state.db).await?;
    info!("all reports, events and sensors deleted");
    Ok(Json(ClearResponse {
        message: "all reports, events and sensors deleted",
    }))
}

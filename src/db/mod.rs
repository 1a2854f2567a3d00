//! Database layer: models and storage operations

pub mod events;
pub mod init;
pub mod reports;
pub mod sensors;

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// One arrival report from a sensor.
///
/// Immutable once stored; at most one row exists per (sensor_id, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SensorReport {
    pub sensor_id: i64,
    /// Arrival time in microseconds since the Unix epoch
    pub timestamp: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Last known position of one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sensor {
    pub sensor_id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// A localized source event produced by one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedEvent {
    /// Estimated emission time in microseconds since the Unix epoch
    pub timestamp: i64,
    pub lat: f64,
    pub lon: f64,
    /// Deduplicated reports used for the estimate, earliest-per-sensor,
    /// ordered by arrival time
    pub reports: Vec<SensorReport>,
}

/// Remove all events, sensors and reports in one transaction.
pub async fn clear_all(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM events").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM sensors").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM reports").execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(())
}

//! Sensor registry: last known position per sensor
//!
//! Positions are overwritten only on significant movement. Last-writer-wins
//! is acceptable under concurrent reports for the same sensor because true
//! positions drift slowly.

use super::Sensor;
use crate::Result;
use geo::{point, HaversineDistance};
use sqlx::SqlitePool;

/// Minimum positional change, in meters, before a sensor's registered
/// location is rewritten.
pub const MOVEMENT_THRESHOLD_M: f64 = 10.0;

/// Record a sensor's reported position.
///
/// Returns `true` when the registry changed (new sensor, or movement beyond
/// [`MOVEMENT_THRESHOLD_M`]); callers publish a registry snapshot on change.
pub async fn observe_position(
    pool: &SqlitePool,
    sensor_id: i64,
    lat: f64,
    lon: f64,
) -> Result<bool> {
    // Concurrent first observations of the same sensor race; the loser's
    // insert is ignored and it falls through to the movement check.
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO sensors (sensor_id, lat, lon) VALUES (?, ?, ?)",
    )
    .bind(sensor_id)
    .bind(lat)
    .bind(lon)
    .execute(pool)
    .await?;
    if inserted.rows_affected() == 1 {
        return Ok(true);
    }

    let stored = sqlx::query_as::<_, Sensor>(
        "SELECT sensor_id, lat, lon FROM sensors WHERE sensor_id = ?",
    )
    .bind(sensor_id)
    .fetch_optional(pool)
    .await?;

    // Row can vanish between the insert and the read if an administrative
    // clear runs concurrently; the next report re-registers the sensor.
    let Some(stored) = stored else {
        return Ok(false);
    };

    let old = point!(x: stored.lon, y: stored.lat);
    let new = point!(x: lon, y: lat);
    if old.haversine_distance(&new) > MOVEMENT_THRESHOLD_M {
        sqlx::query("UPDATE sensors SET lat = ?, lon = ? WHERE sensor_id = ?")
            .bind(lat)
            .bind(lon)
            .bind(sensor_id)
            .execute(pool)
            .await?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Current registry contents
pub async fn snapshot(pool: &SqlitePool) -> Result<Vec<Sensor>> {
    let sensors = sqlx::query_as::<_, Sensor>(
        "SELECT sensor_id, lat, lon FROM sensors ORDER BY sensor_id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(sensors)
}

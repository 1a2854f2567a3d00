//! Raw sensor report storage

use super::SensorReport;
use crate::Result;
use sqlx::SqlitePool;

/// Outcome of a report insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same (sensor_id, timestamp) already exists; the
    /// submission is an idempotent no-op.
    Duplicate,
}

/// Insert a report, treating a duplicate (sensor_id, timestamp) as a no-op.
pub async fn insert_report(pool: &SqlitePool, report: &SensorReport) -> Result<InsertOutcome> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO reports (sensor_id, timestamp, lat, lon) VALUES (?, ?, ?, ?)",
    )
    .bind(report.sensor_id)
    .bind(report.timestamp)
    .bind(report.lat)
    .bind(report.lon)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        Ok(InsertOutcome::Duplicate)
    } else {
        Ok(InsertOutcome::Inserted)
    }
}

/// All reports with timestamp in the closed window `[start_us, end_us]`,
/// ascending by timestamp (the order the correlator requires).
pub async fn reports_in_window(
    pool: &SqlitePool,
    start_us: i64,
    end_us: i64,
) -> Result<Vec<SensorReport>> {
    let reports = sqlx::query_as::<_, SensorReport>(
        "SELECT sensor_id, timestamp, lat, lon FROM reports \
         WHERE timestamp >= ? AND timestamp <= ? ORDER BY timestamp ASC",
    )
    .bind(start_us)
    .bind(end_us)
    .fetch_all(pool)
    .await?;
    Ok(reports)
}

/// All stored reports, ascending by timestamp
pub async fn all_reports(pool: &SqlitePool) -> Result<Vec<SensorReport>> {
    let reports = sqlx::query_as::<_, SensorReport>(
        "SELECT sensor_id, timestamp, lat, lon FROM reports ORDER BY timestamp ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(reports)
}

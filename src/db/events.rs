//! Localized event storage

use super::{LocalizedEvent, SensorReport};
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};

/// Persist a sweep's events in one transaction.
///
/// A failure rolls back every event from the sweep; the caller aborts the
/// sweep and stays armable for the next signal.
pub async fn insert_events(pool: &SqlitePool, events: &[LocalizedEvent]) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for event in events {
        let reports_json = serde_json::to_string(&event.reports)
            .map_err(|e| Error::Internal(format!("serializing contributing reports: {e}")))?;
        sqlx::query("INSERT INTO events (timestamp, lat, lon, reports) VALUES (?, ?, ?, ?)")
            .bind(event.timestamp)
            .bind(event.lat)
            .bind(event.lon)
            .bind(reports_json)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// All persisted events, descending by estimated time
pub async fn all_events(pool: &SqlitePool) -> Result<Vec<LocalizedEvent>> {
    let rows = sqlx::query(
        "SELECT timestamp, lat, lon, reports FROM events ORDER BY timestamp DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let reports_json: String = row.try_get("reports")?;
        let reports: Vec<SensorReport> = serde_json::from_str(&reports_json)
            .map_err(|e| Error::Internal(format!("decoding contributing reports: {e}")))?;
        events.push(LocalizedEvent {
            timestamp: row.try_get("timestamp")?,
            lat: row.try_get("lat")?,
            lon: row.try_get("lon")?,
            reports,
        });
    }
    Ok(events)
}

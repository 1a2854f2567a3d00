//! Detection pipeline: debounce, correlate, localize
//!
//! One sweep runs the correlator over a bounded lookback window, localizes
//! each qualifying group, persists the resulting events in one transaction,
//! and pushes them to subscribers. Sweeps are strictly serialized by the
//! runner loop; a failed sweep is logged and the coordinator stays armable.

pub mod correlate;
pub mod debounce;
pub mod localize;
pub mod solver;

use crate::db::{self, LocalizedEvent, SensorReport};
use crate::events::{EventNotice, PushMessage};
use crate::publish::Publisher;
use crate::{Error, Result};
use debounce::SweepWindow;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Consume sweep windows from the debouncer, one sweep at a time.
pub async fn run_sweeps(
    pool: SqlitePool,
    publisher: Arc<Publisher>,
    mut windows: mpsc::UnboundedReceiver<SweepWindow>,
) {
    while let Some(window) = windows.recv().await {
        match sweep(&pool, &publisher, window).await {
            Ok(events) if !events.is_empty() => {
                info!(
                    "sweep [{}, {}] localized {} event(s)",
                    window.start_us,
                    window.end_us,
                    events.len()
                );
            }
            Ok(_) => {}
            // Abort only this sweep; the next signal re-arms naturally
            Err(e) => warn!("sweep [{}, {}] aborted: {}", window.start_us, window.end_us, e),
        }
    }
}

/// Run one detection sweep over a closed time window.
pub async fn sweep(
    pool: &SqlitePool,
    publisher: &Arc<Publisher>,
    window: SweepWindow,
) -> Result<Vec<LocalizedEvent>> {
    let reports = db::reports::reports_in_window(pool, window.start_us, window.end_us).await?;
    let groups = correlate::qualifying_groups(&reports);
    if groups.is_empty() {
        return Ok(Vec::new());
    }

    // Localization is CPU-bound; keep it off the ingest-serving threads.
    let localized = tokio::task::spawn_blocking(move || localize_groups(groups))
        .await
        .map_err(|e| Error::Internal(format!("localization task panicked: {e}")))?;

    if localized.is_empty() {
        return Ok(Vec::new());
    }

    db::events::insert_events(pool, &localized).await?;

    // Fire-and-forget: publish outcome never affects the sweep's result
    let notices: Vec<EventNotice> = localized.iter().map(EventNotice::from).collect();
    let publisher = Arc::clone(publisher);
    tokio::spawn(async move {
        publisher.publish(&PushMessage::GunshotEvents { events: notices });
    });

    Ok(localized)
}

/// Localize each group, dropping failures without affecting siblings.
fn localize_groups(groups: Vec<Vec<SensorReport>>) -> Vec<LocalizedEvent> {
    groups
        .into_iter()
        .filter_map(|group| match localize::localize(&group) {
            Ok(estimate) => Some(LocalizedEvent {
                timestamp: estimate.time_us,
                lat: estimate.lat,
                lon: estimate.lon,
                reports: group,
            }),
            Err(e) => {
                warn!("group of {} report(s) dropped: {}", group.len(), e);
                None
            }
        })
        .collect()
}

//! Push message types delivered to live subscribers
//!
//! These shapes are an external JSON contract consumed by map clients.

use crate::db::{LocalizedEvent, Sensor, SensorReport};
use serde::{Deserialize, Serialize};

/// Messages published over the push channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushMessage {
    /// Full registry snapshot, sent whenever a sensor is added or moves
    /// beyond the movement threshold
    #[serde(rename = "sensor_update")]
    SensorUpdate { sensors: Vec<Sensor> },

    /// Newly localized events from one sweep
    #[serde(rename = "gunshot_events")]
    GunshotEvents { events: Vec<EventNotice> },
}

/// One localized event as pushed to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventNotice {
    pub contributing_reports: Vec<SensorReport>,
    pub estimated_location: EstimatedLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedLocation {
    pub lat: f64,
    pub lon: f64,
    /// Estimated emission time in microseconds since the Unix epoch
    pub time: i64,
}

impl From<&LocalizedEvent> for EventNotice {
    fn from(event: &LocalizedEvent) -> Self {
        EventNotice {
            contributing_reports: event.reports.clone(),
            estimated_location: EstimatedLocation {
                lat: event.lat,
                lon: event.lon,
                time: event.timestamp,
            },
        }
    }
}

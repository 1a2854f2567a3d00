//! Source localization via TDOA least squares
//!
//! Estimates an omnidirectional source's position and emission time from
//! the arrival times of one impulse at three or more sensors. The fit
//! minimizes the squared difference between each observed arrival time and
//! `T + distance/SPEED_OF_SOUND` over (lat, lon, T), using a bounded
//! derivative-free search seeded at the componentwise median.

use super::solver::{self, Bounds, Options, SolveError};
use crate::db::SensorReport;
use thiserror::Error;

/// Propagation speed used by the arrival-time model, in meters per second
pub const SPEED_OF_SOUND_MPS: f64 = 343.0;

/// Planar approximation: meters per degree of latitude (and of longitude at
/// the equator)
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Per-group localization failures. These never abort a sweep; the group is
/// dropped and its siblings proceed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocalizeError {
    #[error("at least 3 distinct-sensor reports are required, got {0}")]
    InsufficientSensors(usize),

    #[error("localization failed to converge")]
    LocalizationFailed,
}

/// Estimated source position and emission time
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub lat: f64,
    pub lon: f64,
    /// Microseconds since the Unix epoch
    pub time_us: i64,
}

/// Planar distance in meters between a sensor and a candidate source.
///
/// Longitude is scaled by the cosine of the sensor's latitude, matching the
/// arrival-time model's reference latitude convention.
fn planar_distance_m(sensor_lat: f64, sensor_lon: f64, lat: f64, lon: f64) -> f64 {
    let dlat = (lat - sensor_lat) * METERS_PER_DEGREE;
    let dlon = (lon - sensor_lon) * (METERS_PER_DEGREE * sensor_lat.to_radians().cos());
    (dlat * dlat + dlon * dlon).sqrt()
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Estimate source position and emission time from deduplicated reports.
pub fn localize(reports: &[SensorReport]) -> Result<Estimate, LocalizeError> {
    if reports.len() < 3 {
        return Err(LocalizeError::InsufficientSensors(reports.len()));
    }

    // Normalize timestamps to seconds relative to the earliest arrival;
    // keeps magnitudes small for the search, restored at the end.
    let epoch_us = reports.iter().map(|r| r.timestamp).min().unwrap_or(0);
    let observations: Vec<(f64, f64, f64)> = reports
        .iter()
        .map(|r| (r.lat, r.lon, (r.timestamp - epoch_us) as f64 / 1e6))
        .collect();

    let residual = |x: &[f64; solver::DIM]| -> f64 {
        let [lat, lon, t] = *x;
        observations
            .iter()
            .map(|&(s_lat, s_lon, observed)| {
                let distance = planar_distance_m(s_lat, s_lon, lat, lon);
                let predicted = t + distance / SPEED_OF_SOUND_MPS;
                (observed - predicted) * (observed - predicted)
            })
            .sum()
    };

    let mut lats: Vec<f64> = observations.iter().map(|o| o.0).collect();
    let mut lons: Vec<f64> = observations.iter().map(|o| o.1).collect();
    let mut times: Vec<f64> = observations.iter().map(|o| o.2).collect();

    let bounds = Bounds {
        lower: [
            lats.iter().cloned().fold(f64::INFINITY, f64::min),
            lons.iter().cloned().fold(f64::INFINITY, f64::min),
            times.iter().cloned().fold(f64::INFINITY, f64::min),
        ],
        upper: [
            lats.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            lons.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            times.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        ],
    };

    let guess = [median(&mut lats), median(&mut lons), median(&mut times)];

    let best = solver::minimize(residual, guess, &bounds, &Options::default())
        .map_err(|SolveError::DidNotConverge(_)| LocalizeError::LocalizationFailed)?;

    let [lat, lon, t] = best;
    Ok(Estimate {
        lat,
        lon,
        time_us: (t * 1e6).round() as i64 + epoch_us,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE_LAT: f64 = 42.0;
    const SOURCE_LON: f64 = -83.0;
    const SOURCE_TIME_US: i64 = 1_000_000_000;

    /// Build a report whose timestamp is the analytically exact arrival time
    /// of an impulse emitted at the source.
    fn report_at(sensor_id: i64, lat: f64, lon: f64) -> SensorReport {
        let distance = planar_distance_m(lat, lon, SOURCE_LAT, SOURCE_LON);
        let delay_us = distance / SPEED_OF_SOUND_MPS * 1e6;
        SensorReport {
            sensor_id,
            timestamp: SOURCE_TIME_US + delay_us.round() as i64,
            lat,
            lon,
        }
    }

    #[test]
    fn rejects_fewer_than_three_reports() {
        let reports = vec![
            report_at(1, 42.0, -83.0),
            report_at(2, 42.01, -83.0),
        ];
        assert_eq!(
            localize(&reports),
            Err(LocalizeError::InsufficientSensors(2))
        );
    }

    #[test]
    fn zero_noise_estimate_is_accurate() {
        // One sensor co-located with the source keeps the true emission
        // time inside the search box (emission precedes every arrival).
        let reports = vec![
            report_at(1, SOURCE_LAT, SOURCE_LON),
            report_at(2, SOURCE_LAT + 0.01, SOURCE_LON),
            report_at(3, SOURCE_LAT, SOURCE_LON + 0.01),
            report_at(4, SOURCE_LAT - 0.01, SOURCE_LON - 0.008),
        ];

        let estimate = localize(&reports).unwrap();

        let position_error_m =
            planar_distance_m(estimate.lat, estimate.lon, SOURCE_LAT, SOURCE_LON);
        assert!(
            position_error_m < 5.0,
            "position error {position_error_m} m"
        );

        let time_error_us = (estimate.time_us - SOURCE_TIME_US).abs();
        assert!(time_error_us < 10_000, "time error {time_error_us} us");
    }

    #[test]
    fn estimate_is_deterministic() {
        let reports = vec![
            report_at(1, SOURCE_LAT, SOURCE_LON),
            report_at(2, SOURCE_LAT + 0.01, SOURCE_LON),
            report_at(3, SOURCE_LAT, SOURCE_LON + 0.01),
        ];
        let first = localize(&reports).unwrap();
        let second = localize(&reports).unwrap();
        assert_eq!(first, second);
    }
}

//! Temporal-proximity correlation of sensor reports
//!
//! Single-pass greedy grouping: each report, in timestamp order, joins the
//! first open group whose time bounds it sits within and which has not yet
//! heard from its sensor; otherwise it opens a new group. A report is
//! committed to its first matching group and never reconsidered, so the
//! partition is deterministic but not globally optimal.

use crate::db::SensorReport;
use std::collections::HashSet;

/// Maximum propagation-time spread tolerated across the sensor network,
/// in microseconds
pub const TIME_THRESHOLD_US: i64 = 1_000_000;

/// Minimum number of distinct sensors for a group to qualify for
/// localization
pub const MIN_SENSORS: usize = 3;

/// An accumulating cluster of reports hypothesized to share one source
#[derive(Debug, Clone)]
pub struct CandidateGroup {
    pub reports: Vec<SensorReport>,
    pub min_time: i64,
    pub max_time: i64,
    sensor_ids: HashSet<i64>,
}

impl CandidateGroup {
    fn new(report: SensorReport) -> Self {
        let mut sensor_ids = HashSet::new();
        sensor_ids.insert(report.sensor_id);
        let timestamp = report.timestamp;
        CandidateGroup {
            reports: vec![report],
            min_time: timestamp,
            max_time: timestamp,
            sensor_ids,
        }
    }

    fn accepts(&self, report: &SensorReport) -> bool {
        (report.timestamp - self.min_time).abs() <= TIME_THRESHOLD_US
            && (report.timestamp - self.max_time).abs() <= TIME_THRESHOLD_US
            && !self.sensor_ids.contains(&report.sensor_id)
    }

    fn push(&mut self, report: SensorReport) {
        self.min_time = self.min_time.min(report.timestamp);
        self.max_time = self.max_time.max(report.timestamp);
        self.sensor_ids.insert(report.sensor_id);
        self.reports.push(report);
    }

    /// Distinct sensors heard in this group
    pub fn distinct_sensors(&self) -> usize {
        self.sensor_ids.len()
    }

    pub fn qualifies(&self) -> bool {
        self.distinct_sensors() >= MIN_SENSORS
    }

    /// Reports deduplicated by sensor id, keeping the earliest per sensor.
    ///
    /// Input order is arrival order (ascending timestamps), so the first
    /// occurrence is the earliest.
    pub fn deduplicated(&self) -> Vec<SensorReport> {
        let mut seen = HashSet::new();
        self.reports
            .iter()
            .filter(|r| seen.insert(r.sensor_id))
            .cloned()
            .collect()
    }
}

/// Partition reports (sorted ascending by timestamp) into candidate groups.
pub fn correlate(reports: &[SensorReport]) -> Vec<CandidateGroup> {
    let mut groups: Vec<CandidateGroup> = Vec::new();

    for report in reports {
        // First matching group in creation order wins
        match groups.iter_mut().find(|g| g.accepts(report)) {
            Some(group) => group.push(report.clone()),
            None => groups.push(CandidateGroup::new(report.clone())),
        }
    }

    groups
}

/// Qualifying groups, deduplicated and ready for the localizer.
pub fn qualifying_groups(reports: &[SensorReport]) -> Vec<Vec<SensorReport>> {
    correlate(reports)
        .into_iter()
        .filter(CandidateGroup::qualifies)
        .map(|g| g.deduplicated())
        .collect()
}

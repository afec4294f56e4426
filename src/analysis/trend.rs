//! Pass-rate trend across reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::StatusCounts;
use crate::ingest::{Report, sort_reports};

/// One point of the trend: the outcome totals of a single report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub report_id: String,
    pub start: Option<DateTime<Utc>>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pass_rate: f64,
}

/// Computes one [`TrendPoint`] per report, oldest first.
///
/// Reports without a start time are placed last, ordered by id.
pub fn pass_rate_trend(reports: &[Report]) -> Vec<TrendPoint> {
    let mut ordered = reports.to_vec();
    sort_reports(&mut ordered);

    ordered
        .into_iter()
        .map(|report| {
            let counts = StatusCounts::from_records(&report.records);
            TrendPoint {
                report_id: report.id,
                start: report.start,
                total: counts.total(),
                passed: counts.passed,
                failed: counts.failed,
                skipped: counts.skipped,
                pass_rate: counts.pass_rate(),
            }
        })
        .collect()
}

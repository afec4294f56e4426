//! Analytics over execution records.
//!
//! Every analysis here is a pure function from a slice of
//! [`TestExecutionRecord`]s (or [`Report`](crate::ingest::Report)s) to a
//! freshly allocated result. Nothing is cached or shared between calls, so
//! concurrent invocations need no coordination. Callers bound the work by
//! bounding the input.
//!
//! | Module | Question answered |
//! |--------|-------------------|
//! | [`flaky`] | Which tests pass and fail inconsistently? |
//! | [`errors`] | Which failure messages recur, and how badly? |
//! | [`suites`] | How healthy is each suite? |
//! | [`durations`] | How long do executions take? |
//! | [`trend`] | How does the pass rate move across reports? |

pub mod durations;
pub mod errors;
pub mod flaky;
pub mod suites;
pub mod trend;

use serde::Serialize;

use crate::record::{TestExecutionRecord, TestStatus};

/// Errors raised for invalid analysis parameters.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Duration bucket edges were empty, unordered or invalid.
    #[error("Invalid duration buckets: {0}")]
    InvalidBuckets(String),

    /// A built-in normalization pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Per-status counts over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub other: usize,
}

impl StatusCounts {
    /// Adds one execution with the given status.
    pub fn record(&mut self, status: TestStatus) {
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Other => self.other += 1,
        }
    }

    /// Counts every record in the iterator.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TestExecutionRecord>) -> Self {
        let mut counts = Self::default();
        for r in records {
            counts.record(r.status);
        }
        counts
    }

    /// All executions, whatever their status.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.other
    }

    /// Executions that count toward a pass/fail ratio.
    pub fn decided(&self) -> usize {
        self.passed + self.failed
    }

    /// `passed / (passed + failed) * 100`, rounded to one decimal.
    ///
    /// Returns 0.0 when nothing passed or failed.
    pub fn pass_rate(&self) -> f64 {
        let decided = self.decided();
        if decided == 0 {
            return 0.0;
        }
        round_one_decimal(self.passed as f64 / decided as f64 * 100.0)
    }
}

/// Running mean of valid durations.
///
/// The mean is updated incrementally, so it stays finite for any sequence
/// of finite durations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DurationMean {
    mean: f64,
    count: usize,
}

impl DurationMean {
    /// Adds the duration of `record`, if it has a valid one.
    pub fn add(&mut self, record: &TestExecutionRecord) {
        if let Some(d) = record.duration_ms {
            self.add_ms(d.as_millis());
        }
    }

    pub fn add_ms(&mut self, ms: f64) {
        self.count += 1;
        self.mean += (ms - self.mean) / self.count as f64;
    }

    /// Number of durations seen.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Exact mean, `None` when no durations were seen.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Mean rounded to whole milliseconds, 0 when no durations were seen.
    ///
    /// Saturates at `u64::MAX`.
    pub fn rounded(&self) -> u64 {
        self.mean().map_or(0, |mean| mean.round() as u64)
    }
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    let scaled = value * 10.0;
    if !scaled.is_finite() {
        // Magnitudes this large carry no fractional digits.
        return value;
    }
    scaled.round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_rate_excludes_skips() {
        let counts = StatusCounts {
            passed: 2,
            failed: 1,
            skipped: 7,
            other: 1,
        };
        assert_eq!(counts.total(), 11);
        assert_eq!(counts.decided(), 3);
        assert_eq!(counts.pass_rate(), 66.7);
    }

    #[test]
    fn test_pass_rate_empty() {
        assert_eq!(StatusCounts::default().pass_rate(), 0.0);
    }

    #[test]
    fn test_duration_mean() {
        let mut mean = DurationMean::default();
        assert_eq!(mean.mean(), None);
        assert_eq!(mean.rounded(), 0);

        for ms in [10.0, 20.0, 35.0] {
            mean.add_ms(ms);
        }
        assert_eq!(mean.count(), 3);
        assert!((mean.mean().unwrap() - 21.666_666).abs() < 1e-3);
        assert_eq!(mean.rounded(), 22);
    }

    #[test]
    fn test_duration_mean_of_huge_values_stays_finite() {
        let mut mean = DurationMean::default();
        for _ in 0..3 {
            mean.add_ms(1e308);
        }
        mean.add_ms(f64::MAX);
        let value = mean.mean().unwrap();
        assert!(value.is_finite());
        assert!((1e308..=f64::MAX).contains(&value));
        assert_eq!(round_one_decimal(value), value);
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(66.666), 66.7);
        assert_eq!(round_one_decimal(1e308), 1e308);
    }
}

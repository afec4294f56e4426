//! Flaky test detection and scoring.
//!
//! A test is flaky when its outcome is inconsistent across repeated
//! executions: neither reliably passing nor reliably failing. This module
//! groups historical executions by identity key, scores each group by its
//! failure rate, and classifies it.
//!
//! # Classification
//!
//! ```text
//! flaky_score = round(failures / (passes + failures) * 100)
//!
//!   0          10                         90          100
//!   |-- dropped --|------- flaky ---------|-- failing --|
//!   (never failed)  (exclusive bounds)     (kept, not flaky)
//! ```
//!
//! Groups with fewer than [`MIN_RUNS`] passes plus failures are excluded.
//! Skipped executions never count toward the ratio, but their durations
//! still contribute to the average duration.
//!
//! # Example
//!
//! ```
//! use scaledtest::analysis::flaky::classify_flaky_tests;
//! use scaledtest::record::{TestExecutionRecord, TestStatus};
//!
//! let records: Vec<_> = [TestStatus::Passed, TestStatus::Failed, TestStatus::Passed]
//!     .into_iter()
//!     .map(|s| TestExecutionRecord::new("login", s).unwrap().with_suite("Auth"))
//!     .collect();
//!
//! let results = classify_flaky_tests(&records);
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].flaky_score, 33);
//! assert!(results[0].is_flaky);
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DurationMean;
use crate::record::{TestExecutionRecord, TestStatus};

/// Minimum passes plus failures before a test is judged at all.
pub const MIN_RUNS: usize = 3;

/// Scores strictly above this are flaky.
pub const FLAKY_LOWER_BOUND: u32 = 10;

/// Scores strictly below this are flaky.
pub const FLAKY_UPPER_BOUND: u32 = 90;

/// Maximum length of [`FlakyTestResult::test_name`], ellipsis included.
pub const DISPLAY_NAME_MAX: usize = 30;

const ELLIPSIS: &str = "...";

/// Aggregated executions for one identity key.
///
/// Built fresh on every call to [`classify_flaky_tests`] and discarded
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestHistory {
    pub passes: usize,
    pub failures: usize,
    pub skipped: usize,
    /// Valid durations of every execution in the group, skips included.
    pub durations: DurationMean,
}

impl TestHistory {
    /// Adds one execution to the history.
    ///
    /// Statuses other than passed, failed and skipped are not counted.
    pub fn record(&mut self, record: &TestExecutionRecord) {
        match record.status {
            TestStatus::Passed => self.passes += 1,
            TestStatus::Failed => self.failures += 1,
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Other => {}
        }
        self.durations.add(record);
    }

    /// Passes plus failures. Skips are excluded.
    pub fn total_runs(&self) -> usize {
        self.passes + self.failures
    }

    /// Failure percentage rounded to an integer, or `None` below [`MIN_RUNS`].
    pub fn flaky_score(&self) -> Option<u32> {
        let total = self.total_runs();
        if total < MIN_RUNS {
            return None;
        }
        Some((self.failures as f64 / total as f64 * 100.0).round() as u32)
    }

    /// Mean duration rounded to whole milliseconds, 0 with no durations.
    pub fn avg_duration_ms(&self) -> u64 {
        self.durations.rounded()
    }
}

/// A test with observed failures, annotated for triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlakyTestResult {
    /// Display name, truncated to [`DISPLAY_NAME_MAX`] characters.
    ///
    /// Not suitable for looking the test up again; key off the original
    /// records for that.
    pub test_name: String,
    pub suite_name: String,
    /// Passes plus failures.
    pub total_runs: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `round(failed / total_runs * 100)`.
    pub flaky_score: u32,
    pub avg_duration_ms: u64,
    /// `true` when the score lies strictly between the flaky bounds.
    pub is_flaky: bool,
}

/// Returns `true` if a score is in the flaky band `(10, 90)`.
///
/// # Example
///
/// ```
/// use scaledtest::analysis::flaky::is_flaky_score;
///
/// assert!(!is_flaky_score(10));
/// assert!(is_flaky_score(11));
/// assert!(is_flaky_score(89));
/// assert!(!is_flaky_score(90));
/// ```
pub fn is_flaky_score(score: u32) -> bool {
    score > FLAKY_LOWER_BOUND && score < FLAKY_UPPER_BOUND
}

/// Classifies every test in `records` by its failure history.
///
/// Returns one result per identity key with at least [`MIN_RUNS`] counted
/// runs and at least one failure. Flaky tests come first, then higher
/// scores; remaining ties are broken by suite and test name so the output
/// does not depend on input order.
pub fn classify_flaky_tests(records: &[TestExecutionRecord]) -> Vec<FlakyTestResult> {
    let mut histories: HashMap<(&str, &str), TestHistory> = HashMap::new();
    for record in records {
        histories
            .entry(record.identity_key())
            .or_default()
            .record(record);
    }

    let groups = histories.len();
    let mut scored: Vec<((&str, &str), FlakyTestResult)> = histories
        .into_iter()
        .filter_map(|(key, history)| {
            let score = history.flaky_score()?;
            if score == 0 {
                return None;
            }
            let (suite, test) = key;
            Some((
                key,
                FlakyTestResult {
                    test_name: truncate_display_name(test),
                    suite_name: suite.to_string(),
                    total_runs: history.total_runs(),
                    passed: history.passes,
                    failed: history.failures,
                    skipped: history.skipped,
                    flaky_score: score,
                    avg_duration_ms: history.avg_duration_ms(),
                    is_flaky: is_flaky_score(score),
                },
            ))
        })
        .collect();

    scored.sort_by(|(ka, a), (kb, b)| compare_results(a, b).then_with(|| ka.cmp(kb)));

    debug!(
        "Classified {} records into {} tests, {} with failures",
        records.len(),
        groups,
        scored.len()
    );

    scored.into_iter().map(|(_, result)| result).collect()
}

/// Flaky first, then by descending score.
fn compare_results(a: &FlakyTestResult, b: &FlakyTestResult) -> Ordering {
    b.is_flaky
        .cmp(&a.is_flaky)
        .then_with(|| b.flaky_score.cmp(&a.flaky_score))
}

/// Truncates a name to [`DISPLAY_NAME_MAX`] characters, ending in `...`.
///
/// # Example
///
/// ```
/// use scaledtest::analysis::flaky::truncate_display_name;
///
/// assert_eq!(truncate_display_name("short"), "short");
/// assert_eq!(
///     truncate_display_name("a very long test name that keeps going"),
///     "a very long test name that ..."
/// );
/// ```
pub fn truncate_display_name(name: &str) -> String {
    if name.chars().count() <= DISPLAY_NAME_MAX {
        return name.to_string();
    }
    let keep = DISPLAY_NAME_MAX - ELLIPSIS.len();
    let mut truncated: String = name.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

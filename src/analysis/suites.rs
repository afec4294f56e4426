//! Per-suite health overview.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::{DurationMean, StatusCounts};
use crate::record::TestExecutionRecord;

/// Aggregate counts for one suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteSummary {
    pub suite_name: String,
    /// Distinct test names seen in this suite.
    pub unique_tests: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub other: usize,
    /// `passed / (passed + failed) * 100`, one decimal.
    pub pass_rate: f64,
    pub avg_duration_ms: u64,
}

#[derive(Default)]
struct SuiteAccumulator<'a> {
    tests: HashSet<&'a str>,
    counts: StatusCounts,
    duration: DurationMean,
}

/// Summarizes each suite present in `records`, sorted by suite name.
pub fn suite_overview(records: &[TestExecutionRecord]) -> Vec<SuiteSummary> {
    let mut suites: BTreeMap<&str, SuiteAccumulator<'_>> = BTreeMap::new();
    for record in records {
        let acc = suites.entry(record.suite_name.as_str()).or_default();
        acc.tests.insert(record.test_name.as_str());
        acc.counts.record(record.status);
        acc.duration.add(record);
    }

    suites
        .into_iter()
        .map(|(name, acc)| SuiteSummary {
            suite_name: name.to_string(),
            unique_tests: acc.tests.len(),
            total: acc.counts.total(),
            passed: acc.counts.passed,
            failed: acc.counts.failed,
            skipped: acc.counts.skipped,
            other: acc.counts.other,
            pass_rate: acc.counts.pass_rate(),
            avg_duration_ms: acc.duration.rounded(),
        })
        .collect()
}

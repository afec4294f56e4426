//! Execution duration distribution.
//!
//! Durations are counted into half-open buckets defined by ascending edges:
//!
//! ```text
//! edges = [100, 500, 1000]
//!
//! [0, 100)  [100, 500)  [500, 1000)  [1000, inf)
//! ```
//!
//! Percentiles use the nearest-rank method over all valid durations.

use serde::Serialize;
use tracing::debug;

use super::{AnalysisError, DurationMean, round_one_decimal};
use crate::record::TestExecutionRecord;

/// Bucket edges used when none are configured.
pub const DEFAULT_BUCKETS_MS: [f64; 5] = [100.0, 500.0, 1000.0, 5000.0, 10000.0];

/// One histogram bucket. `upper_ms` is `None` for the open-ended last bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationBucket {
    pub lower_ms: f64,
    pub upper_ms: Option<f64>,
    pub count: usize,
}

impl DurationBucket {
    /// Human-readable range, e.g. `100-500ms` or `>=10000ms`.
    pub fn label(&self) -> String {
        match self.upper_ms {
            Some(upper) => format!("{}-{}ms", self.lower_ms, upper),
            None => format!(">={}ms", self.lower_ms),
        }
    }
}

/// Summary statistics over valid durations, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationDistribution {
    pub buckets: Vec<DurationBucket>,
    /// Records without a valid duration.
    pub missing: usize,
    /// `None` when no record had a valid duration.
    pub stats: Option<DurationStats>,
}

/// Builds a histogram and summary statistics of record durations.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidBuckets`] if `edges_ms` is empty, contains
/// a negative or non-finite edge, or is not strictly increasing.
///
/// # Example
///
/// ```
/// use scaledtest::analysis::durations::duration_distribution;
/// use scaledtest::record::{TestExecutionRecord, TestStatus};
///
/// let records = vec![
///     TestExecutionRecord::new("a", TestStatus::Passed)?.with_duration_ms(50.0)?,
///     TestExecutionRecord::new("b", TestStatus::Passed)?.with_duration_ms(150.0)?,
/// ];
/// let dist = duration_distribution(&records, &[100.0]).unwrap();
/// assert_eq!(dist.buckets[0].count, 1);
/// assert_eq!(dist.buckets[1].count, 1);
/// # Ok::<(), scaledtest::record::RecordError>(())
/// ```
pub fn duration_distribution(
    records: &[TestExecutionRecord],
    edges_ms: &[f64],
) -> Result<DurationDistribution, AnalysisError> {
    validate_edges(edges_ms)?;

    let mut buckets: Vec<DurationBucket> = std::iter::once(0.0)
        .chain(edges_ms.iter().copied())
        .enumerate()
        .map(|(i, lower_ms)| DurationBucket {
            lower_ms,
            upper_ms: edges_ms.get(i).copied(),
            count: 0,
        })
        .collect();

    let mut durations: Vec<f64> = Vec::with_capacity(records.len());
    let mut missing = 0;
    for record in records {
        match record.duration_ms {
            Some(d) => durations.push(d.as_millis()),
            None => missing += 1,
        }
    }

    for &ms in &durations {
        // Number of edges <= ms is the bucket index.
        let idx = edges_ms.partition_point(|&edge| edge <= ms);
        buckets[idx].count += 1;
    }

    durations.sort_by(f64::total_cmp);
    let stats = summarize(&durations);

    debug!(
        "Bucketed {} durations into {} buckets ({} missing)",
        durations.len(),
        buckets.len(),
        missing
    );

    Ok(DurationDistribution {
        buckets,
        missing,
        stats,
    })
}

fn validate_edges(edges_ms: &[f64]) -> Result<(), AnalysisError> {
    if edges_ms.is_empty() {
        return Err(AnalysisError::InvalidBuckets(
            "at least one edge is required".to_string(),
        ));
    }
    if let Some(bad) = edges_ms.iter().find(|e| !e.is_finite() || **e <= 0.0) {
        return Err(AnalysisError::InvalidBuckets(format!(
            "edge {} must be finite and positive",
            bad
        )));
    }
    if edges_ms.windows(2).any(|w| w[0] >= w[1]) {
        return Err(AnalysisError::InvalidBuckets(
            "edges must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

/// `sorted` must be ascending.
fn summarize(sorted: &[f64]) -> Option<DurationStats> {
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    let mut mean = DurationMean::default();
    for &ms in sorted {
        mean.add_ms(ms);
    }
    let mean = mean.mean()?;
    Some(DurationStats {
        min,
        max,
        mean: round_one_decimal(mean),
        p50: nearest_rank(sorted, 50.0),
        p90: nearest_rank(sorted, 90.0),
        p99: nearest_rank(sorted, 99.0),
    })
}

fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let rank = (percentile / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

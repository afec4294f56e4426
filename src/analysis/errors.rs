//! Error pattern analysis.
//!
//! Failure messages that differ only in incidental detail (numbers, file
//! paths, stack-trace locations) usually share a root cause. This module
//! normalizes messages of failed executions, groups identical patterns, and
//! grades each group by how often it occurs and how many distinct tests it
//! hits.
//!
//! # Severity
//!
//! | Severity | Occurrences | or Unique tests |
//! |----------|-------------|-----------------|
//! | critical | >= 10 | >= 5 |
//! | high | >= 5 | >= 3 |
//! | medium | >= 3 | >= 2 |
//! | low | otherwise | |

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AnalysisError;
use crate::record::{TestExecutionRecord, TestStatus};

/// Normalized patterns are cut to this many characters.
pub const MAX_PATTERN_LEN: usize = 200;

/// At most this many example test names are kept per pattern.
pub const MAX_EXAMPLE_TESTS: usize = 5;

/// How urgently an error pattern deserves attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Buckets a pattern by occurrence count and distinct affected tests.
    ///
    /// # Example
    ///
    /// ```
    /// use scaledtest::analysis::errors::Severity;
    ///
    /// assert_eq!(Severity::classify(10, 1), Severity::Critical);
    /// assert_eq!(Severity::classify(1, 3), Severity::High);
    /// assert_eq!(Severity::classify(3, 1), Severity::Medium);
    /// assert_eq!(Severity::classify(2, 1), Severity::Low);
    /// ```
    pub fn classify(count: usize, unique_tests: usize) -> Self {
        if count >= 10 || unique_tests >= 5 {
            Severity::Critical
        } else if count >= 5 || unique_tests >= 3 {
            Severity::High
        } else if count >= 3 || unique_tests >= 2 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group of failures sharing one normalized message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPattern {
    /// The normalized message.
    pub pattern: String,
    /// The first raw message seen for this pattern.
    pub sample: String,
    /// Number of failed executions with this pattern.
    pub count: usize,
    /// Number of distinct `(suite, test)` keys affected.
    pub unique_tests: usize,
    /// Up to [`MAX_EXAMPLE_TESTS`] affected test names, sorted.
    pub tests: Vec<String>,
    pub severity: Severity,
}

/// Rewrites failure messages into comparable patterns.
///
/// ```
/// use scaledtest::analysis::errors::MessageNormalizer;
///
/// let normalizer = MessageNormalizer::new()?;
/// assert_eq!(
///     normalizer.normalize("Timeout after 5000ms reading /tmp/run/42/out.log"),
///     "Timeout after <n>ms reading <path>"
/// );
/// # Ok::<(), scaledtest::analysis::AnalysisError>(())
/// ```
pub struct MessageNormalizer {
    js_frame: Regex,
    file_location: Regex,
    path: Regex,
    hex: Regex,
    number: Regex,
    whitespace: Regex,
}

impl MessageNormalizer {
    pub fn new() -> Result<Self, AnalysisError> {
        Ok(Self {
            // at Object.<anonymous> (/src/app.test.js:10:5)
            js_frame: Regex::new(r"\bat\s+[^\s(]+\s*\([^)]*\)")?,
            // src/lib.rs:42:9, app.test.js:10
            file_location: Regex::new(r"[\w./\\-]*\.\w+:\d+(?::\d+)?")?,
            // /a/b/c.ts, C:\a\b
            path: Regex::new(r"(?:[A-Za-z]:)?(?:[\\/][\w.\-]+){2,}")?,
            hex: Regex::new(r"\b0x[0-9a-fA-F]+\b")?,
            number: Regex::new(r"\d+(?:\.\d+)?")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Normalizes one message.
    pub fn normalize(&self, message: &str) -> String {
        let s = self.js_frame.replace_all(message, "at <location>");
        let s = self.file_location.replace_all(&s, "<location>");
        let s = self.path.replace_all(&s, "<path>");
        let s = self.hex.replace_all(&s, "<n>");
        let s = self.number.replace_all(&s, "<n>");
        let s = self.whitespace.replace_all(&s, " ");
        s.trim().chars().take(MAX_PATTERN_LEN).collect()
    }
}

/// The message used for grouping: `message`, else the first trace line.
fn failure_text(record: &TestExecutionRecord) -> Option<&str> {
    record
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .or_else(|| {
            record
                .trace
                .as_deref()
                .and_then(|t| t.lines().map(str::trim).find(|l| !l.is_empty()))
        })
}

#[derive(Default)]
struct PatternGroup<'a> {
    sample: Option<&'a str>,
    count: usize,
    keys: BTreeSet<(&'a str, &'a str)>,
}

/// Groups failed executions by normalized message.
///
/// Passed, skipped and other executions are ignored, as are failures with
/// neither a message nor a trace. Results are sorted by count descending,
/// then by pattern.
pub fn analyze_error_patterns(
    records: &[TestExecutionRecord],
) -> Result<Vec<ErrorPattern>, AnalysisError> {
    let normalizer = MessageNormalizer::new()?;
    let mut groups: HashMap<String, PatternGroup<'_>> = HashMap::new();

    for record in records.iter().filter(|r| r.status == TestStatus::Failed) {
        let Some(text) = failure_text(record) else {
            continue;
        };
        let group = groups.entry(normalizer.normalize(text)).or_default();
        group.sample.get_or_insert(text);
        group.count += 1;
        group.keys.insert(record.identity_key());
    }

    let mut patterns: Vec<ErrorPattern> = groups
        .into_iter()
        .map(|(pattern, group)| {
            let unique_tests = group.keys.len();
            let names: BTreeSet<&str> = group.keys.iter().map(|(_, test)| *test).collect();
            ErrorPattern {
                pattern,
                sample: group.sample.unwrap_or_default().to_string(),
                count: group.count,
                unique_tests,
                tests: names
                    .into_iter()
                    .take(MAX_EXAMPLE_TESTS)
                    .map(str::to_string)
                    .collect(),
                severity: Severity::classify(group.count, unique_tests),
            }
        })
        .collect();

    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pattern.cmp(&b.pattern)));

    debug!("Found {} distinct error patterns", patterns.len());
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(test: &str, message: &str) -> TestExecutionRecord {
        TestExecutionRecord::new(test, TestStatus::Failed)
            .unwrap()
            .with_suite("S")
            .with_message(message)
    }

    #[test]
    fn test_severity_boundaries() {
        assert_eq!(Severity::classify(9, 4), Severity::High);
        assert_eq!(Severity::classify(10, 0), Severity::Critical);
        assert_eq!(Severity::classify(0, 5), Severity::Critical);
        assert_eq!(Severity::classify(4, 2), Severity::Medium);
        assert_eq!(Severity::classify(5, 0), Severity::High);
        assert_eq!(Severity::classify(0, 2), Severity::Medium);
        assert_eq!(Severity::classify(2, 1), Severity::Low);
        assert_eq!(Severity::classify(0, 0), Severity::Low);
    }

    #[test]
    fn test_normalize_numbers() {
        let n = MessageNormalizer::new().unwrap();
        assert_eq!(
            n.normalize("Expected 200 but got 500"),
            n.normalize("Expected 404 but got 500")
        );
        assert_eq!(n.normalize("Expected 1.5 got 0x1F"), "Expected <n> got <n>");
    }

    #[test]
    fn test_normalize_paths_and_locations() {
        let n = MessageNormalizer::new().unwrap();
        assert_eq!(
            n.normalize("ENOENT: no such file /home/ci/build/7/out.json"),
            "ENOENT: no such file <path>"
        );
        assert_eq!(
            n.normalize("boom\n    at Object.<anonymous> (/src/app.test.js:10:5)"),
            "boom at <location>"
        );
        assert_eq!(
            n.normalize("panicked at src/lib.rs:42:9"),
            "panicked at <location>"
        );
    }

    #[test]
    fn test_normalize_truncates() {
        let n = MessageNormalizer::new().unwrap();
        let long = "x".repeat(500);
        assert_eq!(n.normalize(&long).chars().count(), MAX_PATTERN_LEN);
    }

    #[test]
    fn test_grouping_and_severity() {
        let mut records = Vec::new();
        for i in 0..6 {
            records.push(failure(&format!("test_{}", i), &format!("timeout after {}ms", i * 100)));
        }
        records.push(failure("test_x", "assertion failed"));
        records.push(
            TestExecutionRecord::new("test_y", TestStatus::Passed)
                .unwrap()
                .with_message("timeout after 1ms"),
        );

        let patterns = analyze_error_patterns(&records).unwrap();
        assert_eq!(patterns.len(), 2);

        assert_eq!(patterns[0].pattern, "timeout after <n>ms");
        assert_eq!(patterns[0].count, 6);
        assert_eq!(patterns[0].unique_tests, 6);
        assert_eq!(patterns[0].tests.len(), MAX_EXAMPLE_TESTS);
        assert_eq!(patterns[0].sample, "timeout after 0ms");
        assert_eq!(patterns[0].severity, Severity::Critical);

        assert_eq!(patterns[1].pattern, "assertion failed");
        assert_eq!(patterns[1].severity, Severity::Low);
    }

    #[test]
    fn test_falls_back_to_trace() {
        let record = TestExecutionRecord::new("t", TestStatus::Failed)
            .unwrap()
            .with_trace("\nError: connection refused\n  at foo (a.js:1:2)");
        let patterns = analyze_error_patterns(&[record]).unwrap();
        assert_eq!(patterns[0].pattern, "Error: connection refused");
    }

    #[test]
    fn test_failures_without_text_ignored() {
        let record = TestExecutionRecord::new("t", TestStatus::Failed).unwrap();
        assert!(analyze_error_patterns(&[record]).unwrap().is_empty());
    }
}

//! Execution record data model.
//!
//! A [`TestExecutionRecord`] is one observed run of one test, produced by
//! parsing an ingested report. Records are immutable and never updated: a
//! report is append-only history, and analyses read slices of records
//! without owning them.
//!
//! Validation happens here, at construction. Analyses can rely on a
//! [`DurationMs`] being finite and non-negative, and on every record having
//! a non-empty test name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Suite name used when a report does not provide one.
pub const UNKNOWN_SUITE: &str = "Unknown";

/// Errors raised while constructing records from raw report data.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Duration was negative, NaN or infinite.
    #[error("Invalid duration: {0} (must be finite and non-negative)")]
    InvalidDuration(f64),

    /// Test name was empty or whitespace only.
    #[error("Test name must not be empty")]
    EmptyTestName,
}

/// The outcome status of one test execution.
///
/// | Status | Counts toward |
/// |--------|---------------|
/// | Passed | passes |
/// | Failed | failures |
/// | Skipped | neither (tracked separately) |
/// | Other | neither |
///
/// `Other` is where CTRF `pending`, CTRF `other`, and any unrecognized
/// status string end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test assertions succeeded.
    Passed,

    /// Test failed (assertion, error or crash).
    Failed,

    /// Test was intentionally not executed.
    Skipped,

    /// Any status that is none of the above.
    #[serde(other)]
    Other,
}

impl TestStatus {
    /// Parses a status string as found in report files.
    ///
    /// Matching is case-insensitive. Unknown strings map to [`TestStatus::Other`].
    ///
    /// # Example
    ///
    /// ```
    /// use scaledtest::record::TestStatus;
    ///
    /// assert_eq!(TestStatus::parse("passed"), TestStatus::Passed);
    /// assert_eq!(TestStatus::parse("FAILED"), TestStatus::Failed);
    /// assert_eq!(TestStatus::parse("pending"), TestStatus::Other);
    /// ```
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "passed" | "pass" => TestStatus::Passed,
            "failed" | "fail" => TestStatus::Failed,
            "skipped" | "skip" => TestStatus::Skipped,
            _ => TestStatus::Other,
        }
    }

    /// Returns the lowercase name used in reports and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
            TestStatus::Other => "other",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wall-clock duration in milliseconds, guaranteed finite and `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DurationMs(f64);

impl DurationMs {
    /// Creates a duration, rejecting negative and non-finite values.
    ///
    /// # Example
    ///
    /// ```
    /// use scaledtest::record::DurationMs;
    ///
    /// assert!(DurationMs::new(12.5).is_ok());
    /// assert!(DurationMs::new(-1.0).is_err());
    /// assert!(DurationMs::new(f64::NAN).is_err());
    /// ```
    pub fn new(ms: f64) -> Result<Self, RecordError> {
        if ms.is_finite() && ms >= 0.0 {
            Ok(Self(ms))
        } else {
            Err(RecordError::InvalidDuration(ms))
        }
    }

    /// Returns the duration in milliseconds.
    pub fn as_millis(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for DurationMs {
    type Error = RecordError;

    fn try_from(ms: f64) -> Result<Self, Self::Error> {
        Self::new(ms)
    }
}

impl From<DurationMs> for f64 {
    fn from(d: DurationMs) -> Self {
        d.0
    }
}

/// One observed run of one test.
///
/// # Builder Pattern
///
/// ```
/// use scaledtest::record::{TestExecutionRecord, TestStatus};
///
/// let record = TestExecutionRecord::new("login works", TestStatus::Failed)?
///     .with_suite("Auth")
///     .with_duration_ms(120.0)?
///     .with_message("expected 200, got 500");
///
/// assert_eq!(record.suite_name, "Auth");
/// assert_eq!(record.identity_key(), ("Auth", "login works"));
/// # Ok::<(), scaledtest::record::RecordError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionRecord {
    /// Human-readable test title.
    pub test_name: String,

    /// Logical grouping. [`UNKNOWN_SUITE`] when the source has none.
    pub suite_name: String,

    /// Outcome of this run.
    pub status: TestStatus,

    /// Wall-clock time of this run.
    ///
    /// `None` when the source duration was missing or invalid. Such records
    /// still count toward pass/fail totals but not toward duration statistics.
    pub duration_ms: Option<DurationMs>,

    /// Failure message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Stack trace, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,

    /// Identifier of the report this record was read from.
    #[serde(default)]
    pub report_id: String,
}

impl TestExecutionRecord {
    /// Creates a record in the unknown suite with no duration.
    pub fn new(test_name: impl Into<String>, status: TestStatus) -> Result<Self, RecordError> {
        let test_name = test_name.into();
        if test_name.trim().is_empty() {
            return Err(RecordError::EmptyTestName);
        }
        Ok(Self {
            test_name,
            suite_name: UNKNOWN_SUITE.to_string(),
            status,
            duration_ms: None,
            message: None,
            trace: None,
            report_id: String::new(),
        })
    }

    /// Sets the suite name. Empty names fall back to [`UNKNOWN_SUITE`].
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        let suite = suite.into();
        self.suite_name = if suite.trim().is_empty() {
            UNKNOWN_SUITE.to_string()
        } else {
            suite
        };
        self
    }

    /// Sets the duration, validating it.
    pub fn with_duration_ms(mut self, ms: f64) -> Result<Self, RecordError> {
        self.duration_ms = Some(DurationMs::new(ms)?);
        Ok(self)
    }

    /// Sets an already-validated duration.
    pub fn with_duration(mut self, duration: Option<DurationMs>) -> Self {
        self.duration_ms = duration;
        self
    }

    /// Sets the failure message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the stack trace.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Sets the originating report id.
    pub fn with_report_id(mut self, id: impl Into<String>) -> Self {
        self.report_id = id.into();
        self
    }

    /// The `(suite, test)` pair used to group executions of the same test.
    ///
    /// Compared by exact string equality; no case or whitespace folding.
    pub fn identity_key(&self) -> (&str, &str) {
        (&self.suite_name, &self.test_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_rejects_invalid() {
        assert!(DurationMs::new(0.0).is_ok());
        assert!(DurationMs::new(-0.5).is_err());
        assert!(DurationMs::new(f64::INFINITY).is_err());
        assert!(DurationMs::new(f64::NAN).is_err());
    }

    #[test]
    fn test_duration_deserialize_validates() {
        let ok: DurationMs = serde_json::from_str("42.0").unwrap();
        assert_eq!(ok.as_millis(), 42.0);
        assert!(serde_json::from_str::<DurationMs>("-3").is_err());
    }

    #[test]
    fn test_status_unknown_is_other() {
        let status: TestStatus = serde_json::from_str(r#""pending""#).unwrap();
        assert_eq!(status, TestStatus::Other);
        assert_eq!(TestStatus::parse("whatever"), TestStatus::Other);
        assert_eq!(TestStatus::parse(" Skipped "), TestStatus::Skipped);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            TestExecutionRecord::new("  ", TestStatus::Passed),
            Err(RecordError::EmptyTestName)
        ));
    }

    #[test]
    fn test_empty_suite_defaults_to_unknown() {
        let record = TestExecutionRecord::new("a", TestStatus::Passed)
            .unwrap()
            .with_suite("");
        assert_eq!(record.suite_name, UNKNOWN_SUITE);
    }

    #[test]
    fn test_identity_key_is_case_sensitive() {
        let a = TestExecutionRecord::new("Test A", TestStatus::Passed).unwrap();
        let b = TestExecutionRecord::new("test a", TestStatus::Passed).unwrap();
        assert_ne!(a.identity_key(), b.identity_key());
    }
}

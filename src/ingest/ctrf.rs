//! CTRF (Common Test Report Format) JSON parsing.
//!
//! A CTRF document looks like:
//!
//! ```json
//! {
//!   "reportFormat": "CTRF",
//!   "results": {
//!     "tool": { "name": "jest" },
//!     "summary": { "tests": 2, "passed": 1, "failed": 1, "skipped": 0,
//!                  "pending": 0, "other": 0, "start": 1700000000000, "stop": 1700000005000 },
//!     "tests": [
//!       { "name": "adds", "status": "passed", "duration": 12, "suite": "math" },
//!       { "name": "divides", "status": "failed", "duration": 30,
//!         "message": "expected 2, got NaN", "trace": "at divide (math.js:4:9)" }
//!     ]
//!   }
//! }
//! ```
//!
//! `start` and `stop` are Unix timestamps in milliseconds. `suite` may be a
//! string or, in newer producers, an array of nested suite names; arrays are
//! joined with `" > "`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{IngestError, IngestResult, Report, ReportFormat, checked_duration};
use crate::record::{TestExecutionRecord, TestStatus};

const SUITE_SEPARATOR: &str = " > ";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CtrfDocument {
    report_format: Option<String>,
    results: CtrfResults,
}

#[derive(Debug, Deserialize)]
struct CtrfResults {
    tool: CtrfTool,
    #[serde(default)]
    summary: Option<CtrfSummary>,
    #[serde(default)]
    tests: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CtrfTool {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CtrfSummary {
    start: Option<i64>,
    stop: Option<i64>,
}

/// One entry of `results.tests`.
///
/// Fields are raw JSON values; a wrongly typed field never fails
/// deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CtrfTest {
    name: Value,
    status: Value,
    duration: Value,
    suite: Value,
    message: Value,
    trace: Value,
}

impl CtrfTest {
    fn name(&self) -> String {
        self.name.as_str().unwrap_or_default().to_string()
    }

    /// Missing or non-string statuses are [`TestStatus::Other`].
    fn status(&self, id: &str) -> TestStatus {
        match &self.status {
            Value::String(status) => TestStatus::parse(status),
            Value::Null => TestStatus::Other,
            other => {
                warn!(
                    "Test '{}' in report '{}' has non-string status {}",
                    self.name(),
                    id,
                    other
                );
                TestStatus::Other
            }
        }
    }

    fn duration(&self, id: &str) -> Option<f64> {
        match &self.duration {
            Value::Number(n) => n.as_f64(),
            Value::Null => None,
            other => {
                warn!(
                    "Ignoring non-numeric duration {} of '{}' in report '{}'",
                    other,
                    self.name(),
                    id
                );
                None
            }
        }
    }

    /// A suite name, or nested suite names joined with `" > "`.
    fn suite(&self) -> Option<String> {
        match &self.suite {
            Value::String(name) => Some(name.clone()),
            Value::Array(parts) => Some(
                parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(SUITE_SEPARATOR),
            ),
            _ => None,
        }
    }
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// Parses a CTRF JSON document into a [`Report`] with the given id.
///
/// Tests without a name are skipped and invalid durations dropped, each
/// with a warning. A missing or non-string status becomes
/// [`TestStatus::Other`], which no analysis counts as a pass or failure.
///
/// # Errors
///
/// Returns [`IngestError::Json`] for malformed JSON or a document without
/// `results.tool`, and [`IngestError::InvalidReport`] when `reportFormat` is
/// present but not `CTRF`.
///
/// # Example
///
/// ```
/// use scaledtest::ingest::ctrf::parse_ctrf;
///
/// let report = parse_ctrf(r#"{
///     "results": {
///         "tool": { "name": "vitest" },
///         "tests": [{ "name": "renders", "status": "passed", "duration": 8 }]
///     }
/// }"#, "run-1")?;
///
/// assert_eq!(report.tool.as_deref(), Some("vitest"));
/// assert_eq!(report.records[0].suite_name, "Unknown");
/// # Ok::<(), scaledtest::ingest::IngestError>(())
/// ```
pub fn parse_ctrf(content: &str, id: &str) -> IngestResult<Report> {
    let doc: CtrfDocument = serde_json::from_str(content)?;

    if let Some(format) = &doc.report_format
        && !format.eq_ignore_ascii_case("ctrf")
    {
        return Err(IngestError::InvalidReport(format!(
            "reportFormat is '{}', expected 'CTRF'",
            format
        )));
    }

    let mut records = Vec::with_capacity(doc.results.tests.len());
    for entry in doc.results.tests {
        let test = match entry {
            Value::Object(_) => CtrfTest::deserialize(entry)?,
            other => {
                warn!("Skipping non-object test entry in report '{}': {}", id, other);
                continue;
            }
        };
        let name = test.name();
        let status = test.status(id);
        let duration = checked_duration(test.duration(id), &name);
        let suite = test.suite();
        let mut record = match TestExecutionRecord::new(name, status) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping test in report '{}': {}", id, e);
                continue;
            }
        };
        record = record.with_duration(duration).with_report_id(id);
        if let Some(suite) = suite {
            record = record.with_suite(suite);
        }
        if let Some(message) = text(test.message) {
            record = record.with_message(message);
        }
        if let Some(trace) = text(test.trace) {
            record = record.with_trace(trace);
        }
        records.push(record);
    }

    let (start, stop) = doc
        .results
        .summary
        .map(|s| (millis(s.start), millis(s.stop)))
        .unwrap_or((None, None));

    Ok(Report {
        id: id.to_string(),
        format: ReportFormat::Ctrf,
        tool: Some(doc.results.tool.name),
        start,
        stop,
        records,
    })
}

fn millis(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.and_then(DateTime::from_timestamp_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UNKNOWN_SUITE;

    const REPORT: &str = r#"{
        "reportFormat": "CTRF",
        "specVersion": "0.0.0",
        "results": {
            "tool": { "name": "playwright", "version": "1.40.0" },
            "summary": {
                "tests": 5, "passed": 2, "failed": 1, "skipped": 1,
                "pending": 1, "other": 0,
                "start": 1700000000000, "stop": 1700000060000
            },
            "tests": [
                { "name": "login", "status": "passed", "duration": 120, "suite": "Auth" },
                { "name": "logout", "status": "failed", "duration": 80, "suite": ["Auth", "Session"],
                  "message": "Timeout 5000ms exceeded", "trace": "at logout (auth.spec.ts:20:3)",
                  "retries": 2, "flaky": true },
                { "name": "search", "status": "skipped", "duration": 0 },
                { "name": "cart", "status": "pending" },
                { "name": "checkout", "status": "passed", "duration": -4 }
            ],
            "environment": { "branchName": "main" }
        }
    }"#;

    #[test]
    fn test_parse_full_report() {
        let report = parse_ctrf(REPORT, "run-42").unwrap();
        assert_eq!(report.id, "run-42");
        assert_eq!(report.tool.as_deref(), Some("playwright"));
        assert_eq!(report.records.len(), 5);
        assert_eq!(
            report.start.unwrap().timestamp_millis(),
            1_700_000_000_000
        );
        assert_eq!(report.stop.unwrap().timestamp_millis(), 1_700_000_060_000);

        let login = &report.records[0];
        assert_eq!(login.suite_name, "Auth");
        assert_eq!(login.status, TestStatus::Passed);
        assert_eq!(login.duration_ms.unwrap().as_millis(), 120.0);
        assert_eq!(login.report_id, "run-42");

        let logout = &report.records[1];
        assert_eq!(logout.suite_name, "Auth > Session");
        assert_eq!(logout.message.as_deref(), Some("Timeout 5000ms exceeded"));
        assert!(logout.trace.is_some());

        assert_eq!(report.records[2].suite_name, UNKNOWN_SUITE);
        assert_eq!(report.records[2].status, TestStatus::Skipped);
        assert_eq!(report.records[3].status, TestStatus::Other);
        assert!(report.records[3].duration_ms.is_none());
        assert!(report.records[4].duration_ms.is_none());
    }

    #[test]
    fn test_unnamed_tests_skipped() {
        let report = parse_ctrf(
            r#"{"results": {"tool": {"name": "jest"},
                "tests": [{"name": "", "status": "passed"}, {"status": "failed"},
                          {"name": "ok", "status": "passed"}]}}"#,
            "r",
        )
        .unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].test_name, "ok");
    }

    #[test]
    fn test_malformed_entries_do_not_reject_report() {
        let report = parse_ctrf(
            r#"{"results": {"tool": {"name": "jest"}, "tests": [
                {"name": "a", "status": null},
                {"name": "b", "status": "failed", "message": "boom"},
                {"name": "c", "status": 3, "duration": "12"},
                {"name": "d", "status": "passed", "duration": 7, "suite": 42, "trace": false},
                null,
                {"name": ["e"], "status": "passed"}
            ]}}"#,
            "r",
        )
        .unwrap();

        let statuses: Vec<_> = report
            .records
            .iter()
            .map(|r| (r.test_name.as_str(), r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("a", TestStatus::Other),
                ("b", TestStatus::Failed),
                ("c", TestStatus::Other),
                ("d", TestStatus::Passed),
            ]
        );
        assert_eq!(report.records[1].message.as_deref(), Some("boom"));
        assert!(report.records[2].duration_ms.is_none());
        assert_eq!(report.records[3].duration_ms.unwrap().as_millis(), 7.0);
        assert_eq!(report.records[3].suite_name, UNKNOWN_SUITE);
        assert!(report.records[3].trace.is_none());
    }

    #[test]
    fn test_wrong_report_format_rejected() {
        let err = parse_ctrf(
            r#"{"reportFormat": "JUnit", "results": {"tool": {"name": "x"}, "tests": []}}"#,
            "r",
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::InvalidReport(_)));
    }

    #[test]
    fn test_missing_results_rejected() {
        assert!(matches!(
            parse_ctrf(r#"{"tests": []}"#, "r"),
            Err(IngestError::Json(_))
        ));
    }

    #[test]
    fn test_no_summary_means_no_timestamps() {
        let report =
            parse_ctrf(r#"{"results": {"tool": {"name": "x"}, "tests": []}}"#, "r").unwrap();
        assert!(report.start.is_none());
        assert!(report.records.is_empty());
    }
}

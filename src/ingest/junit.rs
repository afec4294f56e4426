//! JUnit XML parsing.
//!
//! Reads the de facto CI format produced by pytest, nextest, surefire, jest-junit
//! and friends:
//!
//! ```xml
//! <testsuites>
//!   <testsuite name="tests.test_math" timestamp="2024-03-01T10:00:00">
//!     <testcase classname="tests.test_math" name="test_add" time="0.100"/>
//!     <testcase classname="tests.test_math" name="test_sub" time="0.150">
//!       <failure message="AssertionError">assert 2 - 1 == 0</failure>
//!     </testcase>
//!     <testcase classname="tests.test_math" name="test_mul" time="0.050">
//!       <skipped/>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! `<failure>` and `<error>` both map to [`TestStatus::Failed`]; the element
//! body becomes the record's trace. The suite is the innermost enclosing
//! `<testsuite name>`, falling back to the test's `classname`. `time` is in
//! seconds and converted to milliseconds.

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use super::{IngestResult, Report, ReportFormat, checked_duration};
use crate::record::{TestExecutionRecord, TestStatus};

#[derive(Debug)]
struct CaseBuilder {
    name: String,
    suite: Option<String>,
    time_secs: Option<f64>,
    status: TestStatus,
    message: Option<String>,
    trace: String,
}

impl CaseBuilder {
    fn from_start(e: &BytesStart<'_>, enclosing_suite: Option<&str>) -> IngestResult<Self> {
        let name = attr(e, "name")?.unwrap_or_default();
        let suite = enclosing_suite
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .or(attr(e, "classname")?);
        // Unparseable times are treated like missing ones.
        let time_secs = attr(e, "time")?.and_then(|t| t.trim().parse::<f64>().ok());
        Ok(Self {
            name,
            suite,
            time_secs,
            status: TestStatus::Passed,
            message: None,
            trace: String::new(),
        })
    }

    fn finish(self, report_id: &str) -> Option<TestExecutionRecord> {
        let duration = checked_duration(self.time_secs.map(|s| s * 1000.0), &self.name);
        let mut record = match TestExecutionRecord::new(self.name, self.status) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping testcase in report '{}': {}", report_id, e);
                return None;
            }
        };
        record = record.with_duration(duration).with_report_id(report_id);
        if let Some(suite) = self.suite {
            record = record.with_suite(suite);
        }
        if let Some(message) = self.message {
            record = record.with_message(message);
        }
        let trace = self.trace.trim();
        if !trace.is_empty() {
            record = record.with_trace(trace);
        }
        Some(record)
    }

    /// Applies a `<failure>`, `<error>` or `<skipped>` child element.
    fn apply_outcome(&mut self, e: &BytesStart<'_>) -> IngestResult<bool> {
        let status = match e.name().as_ref() {
            b"failure" | b"error" => TestStatus::Failed,
            b"skipped" => TestStatus::Skipped,
            _ => return Ok(false),
        };
        self.status = status;
        if let Some(message) = attr(e, "message")? {
            self.message = Some(message);
        }
        Ok(true)
    }
}

/// Parses a JUnit XML document into a [`Report`] with the given id.
///
/// # Example
///
/// ```
/// use scaledtest::ingest::junit::parse_junit;
/// use scaledtest::record::TestStatus;
///
/// let report = parse_junit(r#"
///     <testsuite name="api">
///         <testcase name="get_user" time="0.25"/>
///         <testcase name="put_user"><error message="boom"/></testcase>
///     </testsuite>"#, "nightly")?;
///
/// assert_eq!(report.records.len(), 2);
/// assert_eq!(report.records[1].status, TestStatus::Failed);
/// # Ok::<(), scaledtest::ingest::IngestError>(())
/// ```
pub fn parse_junit(content: &str, id: &str) -> IngestResult<Report> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut suites: Vec<String> = Vec::new();
    let mut current: Option<CaseBuilder> = None;
    let mut capturing = false;
    let mut start: Option<DateTime<Utc>> = None;
    let mut records = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"testsuite" | b"testsuites" => {
                    if start.is_none() {
                        start = attr(&e, "timestamp")?.as_deref().and_then(parse_timestamp);
                    }
                    if e.name().as_ref() == b"testsuite" {
                        suites.push(attr(&e, "name")?.unwrap_or_default());
                    }
                }
                b"testcase" => {
                    current = Some(CaseBuilder::from_start(
                        &e,
                        suites.last().map(String::as_str),
                    )?);
                }
                _ => {
                    if let Some(case) = current.as_mut() {
                        capturing = case.apply_outcome(&e)? && case.status == TestStatus::Failed;
                    }
                }
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"testcase" => {
                    let case = CaseBuilder::from_start(&e, suites.last().map(String::as_str))?;
                    records.extend(case.finish(id));
                }
                _ => {
                    if let Some(case) = current.as_mut() {
                        case.apply_outcome(&e)?;
                    }
                }
            },
            Event::Text(t) if capturing => {
                if let Some(case) = current.as_mut() {
                    case.trace.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) if capturing => {
                if let Some(case) = current.as_mut() {
                    case.trace.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"testsuite" => {
                    suites.pop();
                }
                b"testcase" => {
                    capturing = false;
                    if let Some(case) = current.take() {
                        records.extend(case.finish(id));
                    }
                }
                b"failure" | b"error" => capturing = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(Report {
        id: id.to_string(),
        format: ReportFormat::Junit,
        tool: None,
        start,
        stop: None,
        records,
    })
}

fn attr(e: &BytesStart<'_>, name: &str) -> IngestResult<Option<String>> {
    let Some(attribute) = e
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
    else {
        return Ok(None);
    };
    Ok(Some(attribute.unescape_value()?.into_owned()))
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DDTHH:MM:SS[.f]`, read as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

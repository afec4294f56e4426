//! Result rendering for the console and as JSON.
//!
//! Each analysis has a `write_*` function that renders its result to any
//! [`Write`] in the chosen [`OutputFormat`]. Text output uses `console`
//! styling, which is dropped automatically when stdout is not a terminal.
//! JSON output is the serde representation of the result, pretty-printed.

use std::io::Write;

use anyhow::Result;
use console::style;
use serde::Serialize;

use crate::analysis::durations::DurationDistribution;
use crate::analysis::errors::{ErrorPattern, Severity};
use crate::analysis::flaky::FlakyTestResult;
use crate::analysis::suites::SuiteSummary;
use crate::analysis::trend::TrendPoint;
use crate::config::OutputFormat;

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Applies an optional top-N limit to a ranked result list.
pub fn limited<T>(items: &[T], limit: Option<usize>) -> &[T] {
    match limit {
        Some(n) if n < items.len() => &items[..n],
        _ => items,
    }
}

/// Renders flaky test results.
///
/// Scores in the flaky band are yellow; consistently failing tests are red.
pub fn write_flaky<W: Write>(
    out: &mut W,
    results: &[FlakyTestResult],
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, results);
    }

    if results.is_empty() {
        writeln!(out, "{}", style("No tests with failures found.").green())?;
        return Ok(());
    }

    let flaky = results.iter().filter(|r| r.is_flaky).count();
    writeln!(out, "Flaky Tests:")?;
    writeln!(
        out,
        "  {} flaky, {} failing consistently",
        style(flaky).yellow(),
        style(results.len() - flaky).red()
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "  {:<30}  {:<20}  {:>6}  {:>5}  {:>5}  {:>5}  {:>8}",
        "TEST", "SUITE", "SCORE", "RUNS", "FAIL", "SKIP", "AVG"
    )?;
    for r in results {
        let score = format!("{:>5}%", r.flaky_score);
        let score = if r.is_flaky {
            style(score).yellow()
        } else {
            style(score).red()
        };
        writeln!(
            out,
            "  {:<30}  {:<20}  {}  {:>5}  {:>5}  {:>5}  {:>6}ms",
            r.test_name, r.suite_name, score, r.total_runs, r.failed, r.skipped, r.avg_duration_ms
        )?;
    }
    Ok(())
}

/// Renders error patterns, most frequent first.
pub fn write_errors<W: Write>(
    out: &mut W,
    patterns: &[ErrorPattern],
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, patterns);
    }

    if patterns.is_empty() {
        writeln!(out, "{}", style("No failure messages found.").green())?;
        return Ok(());
    }

    writeln!(out, "Error Patterns:")?;
    for p in patterns {
        let severity = match p.severity {
            Severity::Critical => style(p.severity.as_str()).red().bold(),
            Severity::High => style(p.severity.as_str()).red(),
            Severity::Medium => style(p.severity.as_str()).yellow(),
            Severity::Low => style(p.severity.as_str()).dim(),
        };
        writeln!(out)?;
        writeln!(
            out,
            "  [{}] {} ({} occurrences, {} tests)",
            severity, p.pattern, p.count, p.unique_tests
        )?;
        writeln!(out, "    {}", style(&p.sample).dim())?;
        for test in &p.tests {
            writeln!(out, "    - {}", test)?;
        }
    }
    Ok(())
}

/// Renders the per-suite overview.
pub fn write_suites<W: Write>(
    out: &mut W,
    suites: &[SuiteSummary],
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, suites);
    }

    writeln!(out, "Suites:")?;
    writeln!(
        out,
        "  {:<30}  {:>5}  {:>6}  {:>6}  {:>6}  {:>6}  {:>7}  {:>8}",
        "SUITE", "TESTS", "RUNS", "PASS", "FAIL", "SKIP", "RATE", "AVG"
    )?;
    for s in suites {
        writeln!(
            out,
            "  {:<30}  {:>5}  {:>6}  {:>6}  {:>6}  {:>6}  {:>6.1}%  {:>6}ms",
            s.suite_name,
            s.unique_tests,
            s.total,
            style(s.passed).green(),
            style(s.failed).red(),
            style(s.skipped).yellow(),
            s.pass_rate,
            s.avg_duration_ms
        )?;
    }
    Ok(())
}

/// Renders the duration histogram and summary statistics.
pub fn write_durations<W: Write>(
    out: &mut W,
    dist: &DurationDistribution,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, dist);
    }

    let widest = dist.buckets.iter().map(|b| b.count).max().unwrap_or(0);
    writeln!(out, "Duration Distribution:")?;
    for bucket in &dist.buckets {
        // Bars are scaled to 40 columns.
        let bar_len = if widest == 0 {
            0
        } else {
            bucket.count * 40 / widest
        };
        writeln!(
            out,
            "  {:>14}  {:>6}  {}",
            bucket.label(),
            bucket.count,
            style("#".repeat(bar_len)).cyan()
        )?;
    }
    if dist.missing > 0 {
        writeln!(out, "  {:>14}  {:>6}", "no duration", dist.missing)?;
    }
    if let Some(stats) = &dist.stats {
        writeln!(out)?;
        writeln!(
            out,
            "  min {}ms  mean {}ms  p50 {}ms  p90 {}ms  p99 {}ms  max {}ms",
            stats.min, stats.mean, stats.p50, stats.p90, stats.p99, stats.max
        )?;
    }
    Ok(())
}

/// Renders the pass-rate trend, oldest report first.
pub fn write_trend<W: Write>(out: &mut W, points: &[TrendPoint], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, points);
    }

    writeln!(out, "Pass Rate Trend:")?;
    for p in points {
        let when = p
            .start
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let rate = format!("{:>6.1}%", p.pass_rate);
        let rate = if p.failed == 0 {
            style(rate).green()
        } else {
            style(rate).red()
        };
        writeln!(
            out,
            "  {:<16}  {:<24}  {}  ({} passed, {} failed, {} skipped)",
            when, p.report_id, rate, p.passed, p.failed, p.skipped
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flaky_result(name: &str, score: u32, is_flaky: bool) -> FlakyTestResult {
        FlakyTestResult {
            test_name: name.to_string(),
            suite_name: "Auth".to_string(),
            total_runs: 10,
            passed: 10 - score as usize / 10,
            failed: score as usize / 10,
            skipped: 0,
            flaky_score: score,
            avg_duration_ms: 42,
            is_flaky,
        }
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_limited() {
        let items = [1, 2, 3];
        assert_eq!(limited(&items, Some(2)), &[1, 2]);
        assert_eq!(limited(&items, Some(10)), &[1, 2, 3]);
        assert_eq!(limited(&items, None), &[1, 2, 3]);
    }

    #[test]
    fn test_flaky_text() {
        let results = vec![flaky_result("login", 40, true), flaky_result("logout", 100, false)];
        let text = render(|out| write_flaky(out, &results, OutputFormat::Text));
        assert!(text.contains("Flaky Tests:"));
        assert!(text.contains("login"));
        assert!(text.contains("40%"));
        assert!(text.contains("logout"));
    }

    #[test]
    fn test_flaky_json_round_trips() {
        let results = vec![flaky_result("login", 40, true)];
        let json = render(|out| write_flaky(out, &results, OutputFormat::Json));
        let parsed: Vec<FlakyTestResult> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, results);
    }

    #[test]
    fn test_empty_flaky_text() {
        let text = render(|out| write_flaky(out, &[], OutputFormat::Text));
        assert!(text.contains("No tests with failures found."));
    }

    #[test]
    fn test_trend_text_without_start() {
        let points = vec![TrendPoint {
            report_id: "run-1".to_string(),
            start: None,
            total: 2,
            passed: 1,
            failed: 1,
            skipped: 0,
            pass_rate: 50.0,
        }];
        let text = render(|out| write_trend(out, &points, OutputFormat::Text));
        assert!(text.contains("run-1"));
        assert!(text.contains("50.0%"));
    }
}

//! Configuration schema definitions for scaledtest.
//!
//! This module defines all configuration types that can be deserialized from
//! `scaledtest.toml`. Every section and every field has a default, so an
//! empty file (or no file at all) is a valid configuration.
//!
//! # Schema Overview
//!
//! ```text
//! Config (root)
//! ├── ReportSourceConfig     - Where reports are read from and how many
//! ├── OutputConfig           - Output format and top-N limit
//! └── DurationsConfig        - Histogram bucket edges
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::durations::DEFAULT_BUCKETS_MS;
use crate::ingest::LoadOptions;

/// Root configuration structure for scaledtest.
///
/// # TOML Structure
///
/// ```toml
/// [report]
/// paths = ["reports"]
/// skip_invalid = false
/// max_reports = 50
///
/// [output]
/// format = "json"
/// limit = 10
///
/// [durations]
/// buckets_ms = [100, 500, 1000, 5000, 10000]
/// ```
///
/// # Example
///
/// ```
/// use scaledtest::config::Config;
///
/// let config: Config = toml::from_str(r#"
///     [output]
///     limit = 5
/// "#).unwrap();
///
/// assert_eq!(config.output.limit, Some(5));
/// assert_eq!(config.report.max_concurrent_reads, 16);
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Report sources.
    #[serde(default)]
    pub report: ReportSourceConfig,

    /// Output rendering.
    #[serde(default)]
    pub output: OutputConfig,

    /// Duration distribution settings.
    #[serde(default)]
    pub durations: DurationsConfig,
}

/// Where reports are loaded from.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `paths` | `["reports"]` |
/// | `skip_invalid` | `false` |
/// | `max_reports` | None (all reports) |
/// | `max_concurrent_reads` | 16 |
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSourceConfig {
    /// Files or directories to read reports from.
    ///
    /// Used when no paths are given on the command line. Directories are
    /// scanned for `.json` (CTRF) and `.xml` (JUnit) files.
    #[serde(default = "default_paths")]
    pub paths: Vec<PathBuf>,

    /// Skip reports that fail to parse instead of aborting.
    #[serde(default)]
    pub skip_invalid: bool,

    /// Only analyze the N most recent reports.
    ///
    /// Bounds the work of every analysis; reports are ordered by start time.
    pub max_reports: Option<usize>,

    /// Maximum number of report files read concurrently.
    #[serde(default = "default_max_concurrent_reads")]
    pub max_concurrent_reads: usize,
}

impl Default for ReportSourceConfig {
    fn default() -> Self {
        Self {
            paths: default_paths(),
            skip_invalid: false,
            max_reports: None,
            max_concurrent_reads: default_max_concurrent_reads(),
        }
    }
}

impl ReportSourceConfig {
    /// Loader options derived from this section.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            skip_invalid: self.skip_invalid,
            max_reports: self.max_reports,
            max_concurrent_reads: self.max_concurrent_reads,
        }
    }
}

fn default_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("reports")]
}

fn default_max_concurrent_reads() -> usize {
    16
}

/// Output format for analysis commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored tables for the terminal.
    #[default]
    Text,
    /// Pretty-printed JSON on stdout.
    Json,
}

/// How results are rendered.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Default: `text`
    #[serde(default)]
    pub format: OutputFormat,

    /// Show only the first N results of ranked analyses (flaky, errors).
    pub limit: Option<usize>,
}

/// Duration histogram settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DurationsConfig {
    /// Ascending bucket edges in milliseconds.
    ///
    /// Default: `[100, 500, 1000, 5000, 10000]`
    #[serde(default = "default_buckets")]
    pub buckets_ms: Vec<f64>,
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            buckets_ms: default_buckets(),
        }
    }
}

fn default_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS_MS.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.report.paths, vec![PathBuf::from("reports")]);
        assert!(!config.report.skip_invalid);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.durations.buckets_ms, DEFAULT_BUCKETS_MS.to_vec());
    }

    #[test]
    fn test_full_config() {
        let config: Config = toml::from_str(
            r#"
            [report]
            paths = ["ci/reports", "nightly.json"]
            skip_invalid = true
            max_reports = 20
            max_concurrent_reads = 4

            [output]
            format = "json"
            limit = 3

            [durations]
            buckets_ms = [50, 250]
        "#,
        )
        .unwrap();

        assert_eq!(config.report.paths.len(), 2);
        let options = config.report.load_options();
        assert!(options.skip_invalid);
        assert_eq!(options.max_reports, Some(20));
        assert_eq!(options.max_concurrent_reads, 4);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.limit, Some(3));
        assert_eq!(config.durations.buckets_ms, vec![50.0, 250.0]);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(toml::from_str::<Config>("[report]\npath = \"x\"").is_err());
        assert!(toml::from_str::<Config>("[output]\nformat = \"xml\"").is_err());
    }
}

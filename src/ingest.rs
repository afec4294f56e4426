//! Report ingestion.
//!
//! Turns report files into [`Report`]s holding flat [`TestExecutionRecord`]s.
//! Two formats are understood:
//!
//! | Format | Extension | Parser |
//! |--------|-----------|--------|
//! | CTRF JSON | `.json` | [`ctrf::parse_ctrf`] |
//! | JUnit XML | `.xml` | [`junit::parse_junit`] |
//!
//! Data-quality problems inside a report (an invalid duration, a test with no
//! name) are recovered locally and logged. Problems with the report itself
//! (unreadable file, malformed document) are returned as [`IngestError`].

pub mod ctrf;
pub mod junit;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::record::{DurationMs, TestExecutionRecord};

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while reading and parsing reports.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Failed to read a report file or directory.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the CTRF shape.
    #[error("Invalid CTRF JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not well-formed XML.
    #[error("Invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document parsed but is not a usable report.
    #[error("Invalid report: {0}")]
    InvalidReport(String),

    /// File extension is neither `.json` nor `.xml`.
    #[error("Unsupported report format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Parsing a specific file failed.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<IngestError>,
    },
}

/// Source format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Ctrf,
    Junit,
}

impl ReportFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> IngestResult<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(ReportFormat::Ctrf),
            Some("xml") => Ok(ReportFormat::Junit),
            _ => Err(IngestError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// One ingested test run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Identifier, the file stem for reports loaded from disk.
    pub id: String,
    pub format: ReportFormat,
    /// Name of the tool that produced the report, when known.
    pub tool: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
    pub records: Vec<TestExecutionRecord>,
}

/// Options for [`load_reports`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Log and skip reports that fail to load instead of failing the batch.
    pub skip_invalid: bool,
    /// Keep only this many of the most recent reports.
    pub max_reports: Option<usize>,
    /// Files read and parsed at the same time.
    pub max_concurrent_reads: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            skip_invalid: false,
            max_reports: None,
            max_concurrent_reads: 16,
        }
    }
}

/// Parses report content of a known format.
pub fn parse_report(content: &str, format: ReportFormat, id: &str) -> IngestResult<Report> {
    match format {
        ReportFormat::Ctrf => ctrf::parse_ctrf(content, id),
        ReportFormat::Junit => junit::parse_junit(content, id),
    }
}

/// Reads and parses a single report file.
pub async fn load_report(path: &Path) -> IngestResult<Report> {
    let format = ReportFormat::from_path(path)?;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let report = parse_report(&content, format, &id).map_err(|e| IngestError::Parse {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    debug!(
        "Loaded {} records from {}",
        report.records.len(),
        path.display()
    );
    Ok(report)
}

/// Loads every report reachable from `paths`.
///
/// Directories are scanned (not recursively) for `.json` and `.xml` files;
/// other paths are loaded as given. Files are read concurrently, up to
/// [`LoadOptions::max_concurrent_reads`] at a time.
///
/// Unless [`LoadOptions::skip_invalid`] is set, loading stops at the first
/// file (in path order) that fails, and that file's error is returned.
///
/// The result is ordered oldest first by report start time; reports without
/// a start time come last, ties broken by id. With
/// [`LoadOptions::max_reports`] set, only the most recent reports are kept.
pub async fn load_reports(paths: &[PathBuf], options: &LoadOptions) -> IngestResult<Vec<Report>> {
    let files = expand_paths(paths).await?;
    info!("Loading {} report files", files.len());

    let mut loaded = stream::iter(files)
        .map(|path| async move {
            let result = load_report(&path).await;
            (path, result)
        })
        .buffered(options.max_concurrent_reads.max(1));

    let mut reports = Vec::new();
    while let Some((path, result)) = loaded.next().await {
        match result {
            Ok(report) => reports.push(report),
            Err(e) if options.skip_invalid => {
                warn!("Skipping {}: {}", path.display(), e);
            }
            Err(e) => return Err(e),
        }
    }

    sort_reports(&mut reports);

    if let Some(max) = options.max_reports
        && reports.len() > max
    {
        let dropped = reports.len() - max;
        reports.drain(..dropped);
        debug!("Dropped {} older reports (max_reports = {})", dropped, max);
    }

    Ok(reports)
}

/// Oldest first; undated reports last; ties by id.
pub(crate) fn sort_reports(reports: &mut [Report]) {
    reports.sort_by(|a, b| match (a.start, b.start) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}

async fn expand_paths(paths: &[PathBuf]) -> IngestResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let io_err = |source| IngestError::Io {
            path: path.clone(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
        if !metadata.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let entry_path = entry.path();
            if ReportFormat::from_path(&entry_path).is_err() {
                continue;
            }
            if entry.file_type().await.map_err(io_err)?.is_file() {
                found.push(entry_path);
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Converts a raw duration, logging and dropping invalid values.
pub(crate) fn checked_duration(ms: Option<f64>, test_name: &str) -> Option<DurationMs> {
    let ms = ms?;
    match DurationMs::new(ms) {
        Ok(d) => Some(d),
        Err(e) => {
            warn!("Ignoring duration of '{}': {}", test_name, e);
            None
        }
    }
}

//! scaledtest: analytics over ingested test reports.
//!
//! This crate turns CTRF (and JUnit XML) test reports into flat execution
//! records and computes analytics over them: flaky test detection, error
//! pattern grouping, suite overviews, duration distributions and pass-rate
//! trends.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Record**: The immutable per-execution data model
//! - **Ingest**: Parse report files into records (CTRF, JUnit XML)
//! - **Analysis**: Pure reducers from records to results
//! - **Report**: Render results for the console or as JSON
//!
//! # Example
//!
//! ```no_run
//! use scaledtest::analysis::flaky::classify_flaky_tests;
//! use scaledtest::ingest::{LoadOptions, load_reports};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reports = load_reports(&[PathBuf::from("reports")], &LoadOptions::default()).await?;
//!     let records: Vec<_> = reports.into_iter().flat_map(|r| r.records).collect();
//!     for result in classify_flaky_tests(&records) {
//!         println!("{} {}%", result.test_name, result.flaky_score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod record;
pub mod report;

// Re-export commonly used types
pub use analysis::flaky::{FlakyTestResult, classify_flaky_tests};
pub use config::{Config, load_config};
pub use ingest::{Report, load_reports};
pub use record::{DurationMs, TestExecutionRecord, TestStatus};

//! scaledtest CLI - test report analytics.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use scaledtest::analysis::durations::duration_distribution;
use scaledtest::analysis::errors::analyze_error_patterns;
use scaledtest::analysis::flaky::classify_flaky_tests;
use scaledtest::analysis::suites::suite_overview;
use scaledtest::analysis::trend::pass_rate_trend;
use scaledtest::config::{self, Config, OutputFormat};
use scaledtest::ingest::{Report, load_reports};
use scaledtest::record::TestExecutionRecord;
use scaledtest::report;

#[derive(Parser)]
#[command(name = "scaledtest")]
#[command(about = "Analytics over CTRF and JUnit test reports", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "scaledtest.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Report files or directories (defaults to report.paths from config)
    paths: Vec<PathBuf>,

    /// Output format (overrides output.format from config)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect flaky and consistently failing tests
    Flaky {
        #[command(flatten)]
        source: SourceArgs,

        /// Show only the top N tests
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Group failure messages into recurring error patterns
    Errors {
        #[command(flatten)]
        source: SourceArgs,

        /// Show only the top N patterns
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show pass/fail totals per suite
    Suites {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the distribution of test durations
    Durations {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the pass rate of each report over time
    Trend {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Flaky { source, limit } => flaky(&cli.config, &source, limit).await,
        Commands::Errors { source, limit } => errors(&cli.config, &source, limit).await,
        Commands::Suites { source } => suites(&cli.config, &source).await,
        Commands::Durations { source } => durations(&cli.config, &source).await,
        Commands::Trend { source } => trend(&cli.config, &source).await,
        Commands::Validate => validate_config(&cli.config),
        Commands::Init => init_config(&cli.config),
    }
}

async fn flaky(config_path: &Path, source: &SourceArgs, limit: Option<usize>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (records, format) = load_records(&config, source).await?;

    let results = classify_flaky_tests(&records);
    let shown = report::limited(&results, limit.or(config.output.limit));
    report::write_flaky(&mut std::io::stdout().lock(), shown, format)
}

async fn errors(config_path: &Path, source: &SourceArgs, limit: Option<usize>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (records, format) = load_records(&config, source).await?;

    let patterns = analyze_error_patterns(&records)?;
    let shown = report::limited(&patterns, limit.or(config.output.limit));
    report::write_errors(&mut std::io::stdout().lock(), shown, format)
}

async fn suites(config_path: &Path, source: &SourceArgs) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (records, format) = load_records(&config, source).await?;

    report::write_suites(&mut std::io::stdout().lock(), &suite_overview(&records), format)
}

async fn durations(config_path: &Path, source: &SourceArgs) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (records, format) = load_records(&config, source).await?;

    let dist = duration_distribution(&records, &config.durations.buckets_ms)
        .context("Invalid [durations] configuration")?;
    report::write_durations(&mut std::io::stdout().lock(), &dist, format)
}

async fn trend(config_path: &Path, source: &SourceArgs) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (reports, format) = load(&config, source).await?;

    report::write_trend(&mut std::io::stdout().lock(), &pass_rate_trend(&reports), format)
}

async fn load(config: &Config, source: &SourceArgs) -> Result<(Vec<Report>, OutputFormat)> {
    let paths = if source.paths.is_empty() {
        &config.report.paths
    } else {
        &source.paths
    };
    let reports = load_reports(paths, &config.report.load_options())
        .await
        .context("Failed to load reports")?;
    info!("Loaded {} reports", reports.len());
    Ok((reports, source.format.unwrap_or(config.output.format)))
}

async fn load_records(
    config: &Config,
    source: &SourceArgs,
) -> Result<(Vec<TestExecutionRecord>, OutputFormat)> {
    let (reports, format) = load(config, source).await?;
    let records = reports.into_iter().flat_map(|r| r.records).collect();
    Ok((records, format))
}

fn validate_config(config_path: &Path) -> Result<()> {
    let config = config::load_config(config_path)?;
    duration_distribution(&[], &config.durations.buckets_ms)
        .context("Invalid [durations] configuration")?;

    println!("Configuration is valid!");
    println!();
    println!("Settings:");
    println!("  Report paths: {:?}", config.report.paths);
    println!("  Skip invalid: {}", config.report.skip_invalid);
    match config.report.max_reports {
        Some(n) => println!("  Max reports: {}", n),
        None => println!("  Max reports: all"),
    }
    println!("  Output format: {:?}", config.output.format);
    println!("  Duration buckets: {:?}", config.durations.buckets_ms);

    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first or edit manually.",
            path.display()
        );
    }

    let config = r#"# scaledtest configuration file

[report]
# Files or directories with CTRF (.json) or JUnit (.xml) reports
paths = ["reports"]
skip_invalid = false
# max_reports = 50
max_concurrent_reads = 16

[output]
format = "text"
# limit = 10

[durations]
buckets_ms = [100, 500, 1000, 5000, 10000]
"#;

    std::fs::write(path, config)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    println!();
    println!("Edit the configuration as needed, then run:");
    println!("  scaledtest flaky");

    Ok(())
}

//! Configuration loading and schema definitions for scaledtest.
//!
//! This module provides types and functions for loading scaledtest
//! configuration from TOML files or strings.

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result};

/// Loads scaledtest configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (e.g., doesn't exist or permission denied)
/// - The file contains invalid TOML syntax
/// - The configuration doesn't match the expected schema
///
/// # Example
///
/// ```no_run
/// use scaledtest::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("scaledtest.toml"))?;
/// println!("Report paths: {:?}", config.report.paths);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Loads the config file if it exists, otherwise returns defaults.
///
/// Analysis commands work without a config file; a file that exists but is
/// invalid is still an error.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

/// Loads scaledtest configuration from a TOML string.
///
/// # Example
///
/// ```
/// use scaledtest::config::load_config_str;
///
/// let config = load_config_str(r#"
///     [report]
///     max_reports = 10
/// "#)?;
///
/// assert_eq!(config.report.max_reports, Some(10));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_missing_file_errors() {
        assert!(load_config(Path::new("/no/such/scaledtest.toml")).is_err());
    }

    #[test]
    fn test_load_config_or_default_missing_file() {
        let config = load_config_or_default(Path::new("/no/such/scaledtest.toml")).unwrap();
        assert!(config.output.limit.is_none());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaledtest.toml");
        std::fs::write(&path, "[output]\nlimit = 7\n").unwrap();
        assert_eq!(load_config(&path).unwrap().output.limit, Some(7));

        std::fs::write(&path, "[output\n").unwrap();
        let err = load_config_or_default(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}

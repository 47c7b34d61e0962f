//! Configuration loading for churn analysis.
//!
//! Settings are read from an optional TOML file; every section and field
//! falls back to its default when omitted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::EngineKind;
use crate::output::OutputFormat;

/// Default config file looked up by the CLI.
pub const DEFAULT_CONFIG_PATH: &str = "churn.toml";

/// Complete analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// Engine and data source settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl ChurnConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Engine and data source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Aggregation engine
    pub engine: EngineKind,
    /// SQLite database file; in-memory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Also compute the time-to-next-level report
    pub include_timing: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Memory,
            database: None,
            include_timing: true,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the report files are written to
    pub dir: PathBuf,
    /// File name of the funnel report
    pub churn_file: String,
    /// File name of the timing report
    pub timing_file: String,
    /// File format for reports
    pub format: OutputFormat,
    /// Print report tables to stdout
    pub print_tables: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            churn_file: "churn.csv".to_string(),
            timing_file: "level_times.csv".to_string(),
            format: OutputFormat::Csv,
            print_tables: true,
        }
    }
}

/// Returns the default configuration as a TOML string.
pub fn default_config_toml() -> Result<String, ConfigError> {
    ChurnConfig::default().to_toml()
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing TOML config
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Error serializing TOML config
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

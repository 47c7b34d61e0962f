//! Generator configuration.
//!
//! Loaded from the `[generator]` section of a TOML file. Dates are quoted
//! `YYYY-MM-DD` strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorFile {
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl GeneratorFile {
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

/// Synthetic play-log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// First possible install date (inclusive)
    pub start_date: NaiveDate,
    /// Last possible install date (inclusive)
    pub end_date: NaiveDate,
    /// Shortest session, in events
    pub min_events: u32,
    /// Longest session, in events
    pub max_events: u32,
    /// Number of users to generate
    pub users: usize,
    /// Random seed; drawn from the OS when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid default start date"),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid default end date"),
            min_events: 1,
            max_events: 100,
            users: 1,
            seed: None,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_is_90_days() {
        let config = GeneratorConfig::default();
        assert_eq!((config.end_date - config.start_date).num_days(), 90);
        assert_eq!(config.min_events, 1);
        assert_eq!(config.max_events, 100);
    }

    #[test]
    fn test_parse_partial_section() {
        let file = GeneratorFile::from_str(
            r#"
            [generator]
            start_date = "2023-06-01"
            users = 50
            seed = 7
            "#,
        )
        .unwrap();

        let config = file.generator;
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        assert_eq!(config.end_date, GeneratorConfig::default().end_date);
        assert_eq!(config.users, 50);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_default_toml_round_trips() {
        let file = GeneratorFile::default();
        let toml = file.to_toml().unwrap();
        assert!(toml.contains("start_date = \"2024-01-01\""));
        assert_eq!(GeneratorFile::from_str(&toml).unwrap(), file);
    }

    #[test]
    fn test_bad_date_is_parse_error() {
        let err = GeneratorFile::from_str("[generator]\nend_date = \"March\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}

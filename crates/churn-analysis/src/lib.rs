//! Level churn analysis: per-level funnel and time-to-next-level reports.
//!
//! Play events come from a CSV play log or a SQLite `game_logs` table. Two
//! interchangeable engines compute the same reports: one aggregates events
//! in memory, the other pushes the aggregation into SQL.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   PlayEvent rows   ┌──────────────┐   ChurnReport   ┌────────────┐
//! │ playlog.csv │ ─────────────────▶ │ FunnelEngine │ ──────────────▶ │ churn.csv  │
//! │ game_logs   │                    │ memory|sqlite│                 │ churn.json │
//! └─────────────┘                    └──────────────┘                 └────────────┘
//! ```
//!
//! # Modules
//!
//! - [`funnel`]: Reach, stop and rate arithmetic per observed level
//! - [`timing`]: Average days between consecutive level starts
//! - [`progress`]: Per-user maximum level and level start dates
//! - [`engine`]: The [`FunnelEngine`] trait and the in-memory engine
//! - [`sqlite`]: `game_logs` storage and the SQL engine
//! - [`config`]: TOML configuration
//! - [`output`]: CSV, JSON and console rendering

pub mod config;
pub mod engine;
pub mod funnel;
pub mod output;
pub mod progress;
pub mod sqlite;
pub mod timing;

// Re-export funnel types
pub use funnel::{
    churn_percentage, compute_funnel, retention_percentage, round_ratio, FunnelCounts,
    LevelFunnelStat, RATE_DECIMALS,
};

// Re-export timing types
pub use timing::{average_days_to_next_level, timing_report, LevelTimingStat};

// Re-export progress types
pub use progress::{summarize_users, UserProgress};

// Re-export engine types
pub use engine::{EngineKind, FunnelEngine, MemoryEngine};
pub use sqlite::{SqliteEngine, SqliteStore};

// Re-export config and output types
pub use config::{
    default_config_toml, AnalysisConfig, ChurnConfig, ConfigError, OutputConfig,
    DEFAULT_CONFIG_PATH,
};
pub use output::{ChurnReport, OutputError, OutputFormat};

use std::path::Path;

use churn_events::{read_playlog_file, ParseError, PlayEvent};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during churn analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Malformed or unreadable play log
    #[error("failed to load play log: {0}")]
    Source(#[from] ParseError),
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),
    /// A stored row could not be turned back into an event
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
    /// Neither a play log nor a database was given
    #[error("no input: provide a play log or a database")]
    NoInput,
    /// Error loading configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Error writing reports
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Runs one engine and collects its reports.
pub fn run_engine(
    engine: &dyn FunnelEngine,
    include_timing: bool,
) -> Result<ChurnReport, AnalysisError> {
    info!(engine = engine.name(), "computing level funnel");
    let funnel = engine.level_funnel()?;
    if funnel.is_empty() {
        warn!("no play events found, funnel is empty");
    }

    let timing = if include_timing {
        Some(engine.level_timing()?)
    } else {
        None
    };

    Ok(ChurnReport {
        engine: engine.name().to_string(),
        funnel,
        timing,
    })
}

/// Loads a play log into memory.
pub fn load_events(path: &Path) -> Result<Vec<PlayEvent>, AnalysisError> {
    let events = read_playlog_file(path)?;
    info!(path = %path.display(), events = events.len(), "loaded play log");
    Ok(events)
}

/// Computes the churn report for the configured engine.
///
/// With the memory engine, events come from `input`, or from the configured
/// database when no play log is given. With the SQLite engine, a given play
/// log replaces the contents of `game_logs` before the queries run; without
/// one, the existing table is analyzed.
pub fn analyze(
    config: &AnalysisConfig,
    input: Option<&Path>,
) -> Result<ChurnReport, AnalysisError> {
    match config.engine {
        EngineKind::Memory => {
            let events = match (input, &config.database) {
                (Some(path), _) => load_events(path)?,
                (None, Some(db)) => SqliteStore::open(db)?.read_events()?,
                (None, None) => return Err(AnalysisError::NoInput),
            };
            run_engine(&MemoryEngine::new(&events), config.include_timing)
        }
        EngineKind::Sqlite => {
            let mut store = match &config.database {
                Some(db) => SqliteStore::open(db)?,
                None if input.is_none() => return Err(AnalysisError::NoInput),
                None => SqliteStore::open_in_memory()?,
            };
            if let Some(path) = input {
                let events = load_events(path)?;
                store.replace_events(&events)?;
            }
            run_engine(&SqliteEngine::new(store.connection()), config.include_timing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_without_input_fails() {
        for engine in [EngineKind::Memory, EngineKind::Sqlite] {
            let config = AnalysisConfig {
                engine,
                ..AnalysisConfig::default()
            };
            assert!(matches!(analyze(&config, None), Err(AnalysisError::NoInput)));
        }
    }

    #[test]
    fn test_run_engine_skips_timing() {
        let events = churn_events::fixtures::sample_events();
        let report = run_engine(&MemoryEngine::new(&events), false).unwrap();
        assert_eq!(report.engine, "memory");
        assert_eq!(report.funnel.len(), 4);
        assert!(report.timing.is_none());
    }

    #[test]
    fn test_parse_error_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlog.csv");
        std::fs::write(&path, "userid,install_date,play_date,level_cleared\nu,2024-01-01,2024-01-01,x\n")
            .unwrap();

        let err = analyze(&AnalysisConfig::default(), Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Source(ParseError::InvalidLevel { line: 2, .. })
        ));
    }
}

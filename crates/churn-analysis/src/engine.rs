//! Funnel engines.
//!
//! An engine is a read-only view over one data source that can produce the
//! level funnel and the timing report. The data source is injected when the
//! engine is built; engines never open connections or files themselves.

use std::collections::BTreeMap;
use std::fmt;

use churn_events::{Level, PlayEvent};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::funnel::{compute_funnel, LevelFunnelStat};
use crate::timing::{timing_report, LevelTimingStat};
use crate::AnalysisError;

/// Source-independent access to the churn reports.
pub trait FunnelEngine {
    /// Short engine name used in logs and report metadata.
    fn name(&self) -> &'static str;

    /// Level funnel rows in ascending level order.
    fn level_funnel(&self) -> Result<Vec<LevelFunnelStat>, AnalysisError>;

    /// Timing rows in ascending level order.
    fn level_timing(&self) -> Result<Vec<LevelTimingStat>, AnalysisError>;

    /// Unrounded average days to the next level, keyed by level.
    fn average_days_to_next_level(&self) -> Result<BTreeMap<Level, f64>, AnalysisError> {
        Ok(self
            .level_timing()?
            .into_iter()
            .map(|stat| (stat.level, stat.mean_days()))
            .collect())
    }
}

/// Aggregates a borrowed slice of events in memory.
#[derive(Debug, Clone, Copy)]
pub struct MemoryEngine<'a> {
    events: &'a [PlayEvent],
}

impl<'a> MemoryEngine<'a> {
    pub fn new(events: &'a [PlayEvent]) -> Self {
        Self { events }
    }
}

impl FunnelEngine for MemoryEngine<'_> {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn level_funnel(&self) -> Result<Vec<LevelFunnelStat>, AnalysisError> {
        Ok(compute_funnel(self.events))
    }

    fn level_timing(&self) -> Result<Vec<LevelTimingStat>, AnalysisError> {
        Ok(timing_report(self.events))
    }
}

/// Which engine computes the reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Aggregate events in memory
    #[default]
    Memory,
    /// Load events into SQLite and aggregate with SQL
    #[value(alias = "sql")]
    Sqlite,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}

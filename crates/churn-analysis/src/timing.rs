//! Time-to-next-level report.
//!
//! For every user and level, the level start is the earliest play date at
//! which the level was recorded. A user contributes to `level` when they
//! also have a start for `level + 1`; the contribution is the number of
//! days between the two starts. Gaps in the level sequence produce no row.

use std::collections::BTreeMap;

use churn_events::{days_between, Level, PlayEvent};
use serde::{Deserialize, Serialize};

use crate::funnel::round_ratio;
use crate::progress::summarize_users;

/// Decimal places kept for the reported average.
pub const TIMING_DECIMALS: u32 = 1;

/// Average days from starting a level to starting the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTimingStat {
    pub level: Level,
    /// Rounded average, in days.
    pub avg_days_to_complete: f64,
    /// Users that have both `level` and `level + 1`.
    pub users: u64,
    /// Sum of the per-user day deltas.
    #[serde(skip)]
    pub total_days: i64,
}

impl LevelTimingStat {
    /// Builds a row from summed deltas.
    pub fn from_totals(level: Level, total_days: i64, users: u64) -> Self {
        Self {
            level,
            avg_days_to_complete: round_ratio(
                i128::from(total_days),
                u128::from(users),
                TIMING_DECIMALS,
            ),
            users,
            total_days,
        }
    }

    /// Unrounded average days.
    pub fn mean_days(&self) -> f64 {
        if self.users == 0 {
            0.0
        } else {
            self.total_days as f64 / self.users as f64
        }
    }
}

/// Collects (sum of deltas, user count) per level.
fn level_totals(events: &[PlayEvent]) -> BTreeMap<Level, (i64, u64)> {
    let mut totals: BTreeMap<Level, (i64, u64)> = BTreeMap::new();

    for progress in summarize_users(events).values() {
        for (&level, &start) in &progress.level_start_dates {
            let Some(next_start) = level
                .checked_add(1)
                .and_then(|next| progress.level_start(next))
            else {
                continue;
            };
            let entry = totals.entry(level).or_insert((0, 0));
            entry.0 += days_between(start, next_start);
            entry.1 += 1;
        }
    }

    totals
}

/// Average days to reach `level + 1` after first reaching `level`.
///
/// Levels without any user holding both starts are absent, not zero.
pub fn average_days_to_next_level(events: &[PlayEvent]) -> BTreeMap<Level, f64> {
    timing_report(events)
        .into_iter()
        .map(|stat| (stat.level, stat.mean_days()))
        .collect()
}

/// Timing rows ordered by level, with rounded averages.
pub fn timing_report(events: &[PlayEvent]) -> Vec<LevelTimingStat> {
    level_totals(events)
        .into_iter()
        .map(|(level, (total_days, users))| LevelTimingStat::from_totals(level, total_days, users))
        .collect()
}

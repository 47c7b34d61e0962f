//! Level Funnel
//!
//! Computes the per-level drop-off curve: how many users reached each
//! observed level, how many stopped there, and the derived churn,
//! retention and progression rates.
//!
//! Levels are the distinct `level_cleared` values present in the input.
//! Gaps are kept as-is, so "next level" always means the next *observed*
//! level.

use std::collections::BTreeMap;

use churn_events::{Level, PlayEvent};
use serde::{Deserialize, Serialize};

use crate::progress::summarize_users;

/// Decimal places kept for churn, retention and progression rates.
pub const RATE_DECIMALS: u32 = 2;

/// User counts for one level, before any rate is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunnelCounts {
    pub level: Level,
    /// Users whose highest cleared level is at least `level`.
    pub users_reached: u64,
    /// Users whose highest cleared level is exactly `level`.
    pub users_stopped: u64,
}

/// One row of the level funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFunnelStat {
    pub level: Level,
    #[serde(rename = "total_users_reached")]
    pub users_reached: u64,
    pub users_stopped: u64,
    pub churn_rate: f64,
    pub retention_rate: f64,
    /// `None` for the last observed level.
    pub progression_rate: Option<f64>,
}

impl LevelFunnelStat {
    /// Derives the rounded rates for a level.
    ///
    /// `next_users_reached` is the reach of the next observed level, or
    /// `None` when `counts` is the last level. Rates are rounded from the
    /// exact user ratios, so ties always round away from zero.
    pub fn from_counts(counts: FunnelCounts, next_users_reached: Option<u64>) -> Self {
        let FunnelCounts {
            level,
            users_reached,
            users_stopped,
        } = counts;

        let retention_rate = if users_reached == 0 {
            100.0
        } else {
            rounded_percentage(users_reached.saturating_sub(users_stopped), users_reached)
        };

        Self {
            level,
            users_reached,
            users_stopped,
            churn_rate: rounded_percentage(users_stopped, users_reached),
            retention_rate,
            progression_rate: next_users_reached
                .map(|next| rounded_percentage(next, users_reached)),
        }
    }
}

/// Unrounded churn: stopped users as a share of reached users.
///
/// Zero reached users means zero churn.
pub fn churn_percentage(users_stopped: u64, users_reached: u64) -> f64 {
    if users_reached == 0 {
        0.0
    } else {
        users_stopped as f64 / users_reached as f64 * 100.0
    }
}

/// Unrounded retention, the complement of [`churn_percentage`].
pub fn retention_percentage(users_stopped: u64, users_reached: u64) -> f64 {
    100.0 - churn_percentage(users_stopped, users_reached)
}

fn rounded_percentage(part: u64, whole: u64) -> f64 {
    round_ratio(i128::from(part) * 100, u128::from(whole), RATE_DECIMALS)
}

/// Rounds `numerator / denominator` half away from zero to `decimals`
/// places, in integer arithmetic. A zero denominator yields zero.
pub fn round_ratio(numerator: i128, denominator: u128, decimals: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let scale = 10u128.pow(decimals);
    let scaled = numerator.unsigned_abs() * scale;
    let rounded = (2 * scaled + denominator) / (2 * denominator);

    let value = rounded as f64 / scale as f64;
    if numerator < 0 {
        -value
    } else {
        value
    }
}

/// Counts reached and stopped users for every observed level, ascending.
pub fn funnel_counts(events: &[PlayEvent]) -> Vec<FunnelCounts> {
    let users = summarize_users(events);

    // Every observed level, with the number of users that stopped there.
    let mut stopped: BTreeMap<Level, u64> =
        events.iter().map(|e| (e.level_cleared, 0)).collect();
    for progress in users.values() {
        *stopped.entry(progress.max_level_cleared).or_insert(0) += 1;
    }

    // Reach is a running total of stopped users from the top level down.
    let mut reached = 0u64;
    let mut counts: Vec<FunnelCounts> = stopped
        .iter()
        .rev()
        .map(|(&level, &users_stopped)| {
            reached += users_stopped;
            FunnelCounts {
                level,
                users_reached: reached,
                users_stopped,
            }
        })
        .collect();
    counts.reverse();
    counts
}

/// Turns ascending level counts into funnel rows.
pub fn build_rows(counts: &[FunnelCounts]) -> Vec<LevelFunnelStat> {
    counts
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let next = counts.get(i + 1).map(|n| n.users_reached);
            LevelFunnelStat::from_counts(c, next)
        })
        .collect()
}

/// Computes the level funnel for a set of play events.
///
/// Empty input yields an empty funnel.
pub fn compute_funnel(events: &[PlayEvent]) -> Vec<LevelFunnelStat> {
    build_rows(&funnel_counts(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_events::fixtures::{sample_events, single_user_scenario, three_user_scenario};

    fn row(funnel: &[LevelFunnelStat], level: Level) -> &LevelFunnelStat {
        funnel
            .iter()
            .find(|r| r.level == level)
            .unwrap_or_else(|| panic!("no row for level {level}"))
    }

    #[test]
    fn test_empty_input_yields_empty_funnel() {
        assert!(compute_funnel(&[]).is_empty());
    }

    #[test]
    fn test_three_user_scenario() {
        let funnel = compute_funnel(&three_user_scenario());
        assert_eq!(funnel.len(), 2);

        let three = row(&funnel, 3);
        assert_eq!(three.users_reached, 3);
        assert_eq!(three.users_stopped, 1);
        assert_eq!(three.churn_rate, 33.33);
        assert_eq!(three.retention_rate, 66.67);
        assert_eq!(three.progression_rate, Some(66.67));

        let five = row(&funnel, 5);
        assert_eq!(five.users_reached, 2);
        assert_eq!(five.users_stopped, 2);
        assert_eq!(five.churn_rate, 100.0);
        assert_eq!(five.retention_rate, 0.0);
        assert_eq!(five.progression_rate, None);
    }

    #[test]
    fn test_single_user_single_level() {
        let funnel = compute_funnel(&single_user_scenario());
        assert_eq!(
            funnel,
            vec![LevelFunnelStat {
                level: 1,
                users_reached: 1,
                users_stopped: 1,
                churn_rate: 100.0,
                retention_rate: 0.0,
                progression_rate: None,
            }]
        );
    }

    #[test]
    fn test_sample_funnel() {
        let funnel = compute_funnel(&sample_events());
        let levels: Vec<Level> = funnel.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![1, 2, 3, 5], "level 4 gap is preserved");

        let reached: Vec<u64> = funnel.iter().map(|r| r.users_reached).collect();
        assert_eq!(reached, vec![4, 3, 2, 1]);

        assert_eq!(row(&funnel, 1).churn_rate, 25.0);
        assert_eq!(row(&funnel, 1).progression_rate, Some(75.0));
        assert_eq!(row(&funnel, 2).churn_rate, 33.33);
        assert_eq!(row(&funnel, 2).progression_rate, Some(66.67));
        // Progression from 3 goes to the next observed level, 5
        assert_eq!(row(&funnel, 3).progression_rate, Some(50.0));
        assert_eq!(row(&funnel, 5).progression_rate, None);
    }

    #[test]
    fn test_levels_below_every_max_have_zero_stopped() {
        // Both remaining users pass level 0 and stop at 5
        let mut events = three_user_scenario();
        events.retain(|e| e.user_id != "b");
        for e in events.clone() {
            events.push(PlayEvent { level_cleared: 0, ..e });
        }
        let funnel = compute_funnel(&events);
        let zero = row(&funnel, 0);
        assert_eq!(zero.users_reached, 2);
        assert_eq!(zero.users_stopped, 0);
        assert_eq!(zero.churn_rate, 0.0);
        assert_eq!(zero.retention_rate, 100.0);
    }

    #[test]
    fn test_from_counts_zero_reached_is_zero_churn() {
        let stat = LevelFunnelStat::from_counts(
            FunnelCounts {
                level: 7,
                users_reached: 0,
                users_stopped: 0,
            },
            Some(0),
        );
        assert_eq!(stat.churn_rate, 0.0);
        assert_eq!(stat.retention_rate, 100.0);
        assert_eq!(stat.progression_rate, Some(0.0));
    }

    #[test]
    fn test_round_ratio_half_away_from_zero() {
        assert_eq!(round_ratio(5, 2, 0), 3.0);
        assert_eq!(round_ratio(-5, 2, 0), -3.0);
        assert_eq!(round_ratio(100, 3, 2), 33.33);
        assert_eq!(round_ratio(200, 3, 2), 66.67);
        assert_eq!(round_ratio(5, 4, 1), 1.3);
        assert_eq!(round_ratio(3, 20, 1), 0.2);
        assert_eq!(round_ratio(7, 0, 2), 0.0);
    }

    #[test]
    fn test_exact_ties_round_up() {
        // 23 of 160 is exactly 14.375 percent
        let stat = LevelFunnelStat::from_counts(
            FunnelCounts {
                level: 1,
                users_reached: 160,
                users_stopped: 23,
            },
            Some(137),
        );
        assert_eq!(stat.churn_rate, 14.38);
        assert_eq!(stat.retention_rate, 85.63);
        assert_eq!(stat.progression_rate, Some(85.63));

        for (stopped, churn) in [(41, 25.63), (87, 54.38)] {
            let stat = LevelFunnelStat::from_counts(
                FunnelCounts {
                    level: 1,
                    users_reached: 160,
                    users_stopped: stopped,
                },
                None,
            );
            assert_eq!(stat.churn_rate, churn, "{stopped} of 160");
        }
    }

    #[test]
    fn test_retention_is_complement_of_churn() {
        for reached in 0..=400u64 {
            for stopped in 0..=reached {
                let churn = churn_percentage(stopped, reached);
                assert_eq!(retention_percentage(stopped, reached), 100.0 - churn);

                let stat = LevelFunnelStat::from_counts(
                    FunnelCounts {
                        level: 0,
                        users_reached: reached,
                        users_stopped: stopped,
                    },
                    None,
                );
                assert!((stat.churn_rate + stat.retention_rate - 100.0).abs() <= 0.01 + 1e-9);
                assert!((stat.churn_rate - churn).abs() <= 0.005 + 1e-9);
            }
        }
    }

    #[test]
    fn test_compute_is_idempotent() {
        let events = sample_events();
        assert_eq!(compute_funnel(&events), compute_funnel(&events));
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let events = sample_events();
        let mut reversed = events.clone();
        reversed.reverse();
        assert_eq!(compute_funnel(&events), compute_funnel(&reversed));
    }
}

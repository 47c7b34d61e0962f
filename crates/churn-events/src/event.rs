//! Play Event Types
//!
//! A play event records that a user had cleared a given level as of a
//! given play date. Events are immutable once recorded; a user usually has
//! one event per level or per day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A game level number. Levels are non-negative by construction.
pub type Level = u32;

/// One record of a user's progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayEvent {
    /// Opaque player identifier, unique per player within one analysis.
    #[serde(rename = "userid")]
    pub user_id: String,
    /// Date the user first installed the game.
    pub install_date: NaiveDate,
    /// Date of this play event.
    pub play_date: NaiveDate,
    /// Level completed as of this event.
    pub level_cleared: Level,
}

impl PlayEvent {
    /// Creates a new play event.
    pub fn new(
        user_id: impl Into<String>,
        install_date: NaiveDate,
        play_date: NaiveDate,
        level_cleared: Level,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            install_date,
            play_date,
            level_cleared,
        }
    }

    /// Days elapsed between install and this play event.
    pub fn days_since_install(&self) -> i64 {
        crate::date::days_between(self.install_date, self.play_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_event() {
        let event = PlayEvent::new("u1", date(2024, 1, 1), date(2024, 1, 3), 2);
        assert_eq!(event.user_id, "u1");
        assert_eq!(event.level_cleared, 2);
        assert_eq!(event.days_since_install(), 2);
    }

    #[test]
    fn test_events_compare_by_value() {
        let a = PlayEvent::new("u1", date(2024, 1, 1), date(2024, 1, 1), 0);
        let b = a.clone();
        assert_eq!(a, b);

        let c = PlayEvent {
            level_cleared: 1,
            ..a.clone()
        };
        assert_ne!(a, c);
    }
}

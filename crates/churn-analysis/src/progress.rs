//! Per-user progress derived from play events.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use churn_events::{Level, PlayEvent};

/// What a single user achieved across all of their events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProgress {
    /// Highest level cleared in any event.
    pub max_level_cleared: Level,
    /// Earliest play date at which each level was recorded.
    pub level_start_dates: BTreeMap<Level, NaiveDate>,
}

impl UserProgress {
    /// Folds one event into the progress.
    pub fn record(&mut self, event: &PlayEvent) {
        self.max_level_cleared = self.max_level_cleared.max(event.level_cleared);
        self.level_start_dates
            .entry(event.level_cleared)
            .and_modify(|start| *start = (*start).min(event.play_date))
            .or_insert(event.play_date);
    }

    /// Earliest date the user was seen at `level`, if ever.
    pub fn level_start(&self, level: Level) -> Option<NaiveDate> {
        self.level_start_dates.get(&level).copied()
    }
}

/// Groups events by user. Users without events never appear.
pub fn summarize_users(events: &[PlayEvent]) -> BTreeMap<&str, UserProgress> {
    let mut users: BTreeMap<&str, UserProgress> = BTreeMap::new();
    for event in events {
        users
            .entry(event.user_id.as_str())
            .or_default()
            .record(event);
    }
    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_events::fixtures::{day, sample_events};

    #[test]
    fn test_empty_events_have_no_users() {
        assert!(summarize_users(&[]).is_empty());
    }

    #[test]
    fn test_max_level_per_user() {
        let events = sample_events();
        let users = summarize_users(&events);

        assert_eq!(users.len(), 4);
        assert_eq!(users["alice"].max_level_cleared, 3);
        assert_eq!(users["bob"].max_level_cleared, 2);
        assert_eq!(users["carol"].max_level_cleared, 1);
        assert_eq!(users["dave"].max_level_cleared, 5);
    }

    #[test]
    fn test_level_start_is_earliest_play_date() {
        let events = sample_events();
        let users = summarize_users(&events);

        // alice has level 3 on both Jan 4 and Jan 5
        assert_eq!(users["alice"].level_start(3), Some(day(4)));
        // bob's events are listed out of date order
        assert_eq!(users["bob"].level_start(1), Some(day(2)));
        assert_eq!(users["bob"].level_start(2), Some(day(5)));
        assert_eq!(users["dave"].level_start(4), None);
    }

    #[test]
    fn test_record_keeps_minimum_when_later_event_is_earlier() {
        let mut progress = UserProgress::default();
        progress.record(&PlayEvent::new("u", day(1), day(9), 2));
        progress.record(&PlayEvent::new("u", day(1), day(3), 2));
        progress.record(&PlayEvent::new("u", day(1), day(5), 1));

        assert_eq!(progress.max_level_cleared, 2);
        assert_eq!(progress.level_start(2), Some(day(3)));
        assert_eq!(progress.level_start(1), Some(day(5)));
    }
}

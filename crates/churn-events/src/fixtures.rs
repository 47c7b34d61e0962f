//! Sample data fixtures for testing.
//!
//! This module provides ready-made play logs for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // churn-events = { path = "../churn-events", features = ["test-fixtures"] }
//!
//! use churn_events::fixtures;
//!
//! let events = fixtures::sample_events();
//! ```

use chrono::NaiveDate;

use crate::{read_playlog, PlayEvent};

/// Returns sample events from the fixtures file.
///
/// Contains 11 events for 4 users:
/// - alice stops at level 3 (levels 1, 2, 3, with a repeat of 3)
/// - bob stops at level 2 (events out of date order)
/// - carol stops at level 1
/// - dave stops at level 5 (level 4 never observed)
pub fn sample_events() -> Vec<PlayEvent> {
    let csv = include_str!("../tests/fixtures/sample_playlog.csv");
    read_playlog(csv.as_bytes())
        .unwrap_or_else(|e| panic!("Failed to parse sample_playlog.csv: {}", e))
}

/// Returns the events of a single user by ID from the sample events.
pub fn user_events(user_id: &str) -> Vec<PlayEvent> {
    sample_events()
        .into_iter()
        .filter(|e| e.user_id == user_id)
        .collect()
}

/// Three users whose only observed levels are 3 and 5.
///
/// Users `a` and `c` stop at level 5, user `b` stops at level 3.
pub fn three_user_scenario() -> Vec<PlayEvent> {
    let install = day(1);
    vec![
        PlayEvent::new("a", install, day(1), 3),
        PlayEvent::new("a", install, day(2), 5),
        PlayEvent::new("b", install, day(1), 3),
        PlayEvent::new("c", install, day(3), 3),
        PlayEvent::new("c", install, day(4), 5),
    ]
}

/// A single user that only ever clears level 1.
pub fn single_user_scenario() -> Vec<PlayEvent> {
    vec![PlayEvent::new("solo", day(1), day(1), 1)]
}

/// Returns a January 2024 date.
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("January has 31 days")
}

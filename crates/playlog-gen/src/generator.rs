//! Synthetic Play-Log Generator
//!
//! Produces fixture play logs: each synthetic user installs on a random day
//! inside the configured window, then plays once a day and clears exactly
//! one level per day. This is a test-data fixture, not a player model.

use chrono::{Days, NaiveDate};
use churn_events::{Level, PlayEvent};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::GeneratorConfig;

/// Errors raised when the generator settings are inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum GeneratorError {
    #[error("install window is empty: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("session length range is empty: min {min} is greater than max {max}")]
    InvalidSessionRange { min: u32, max: u32 },
}

/// Builds one user's session.
///
/// Event `i` is played `i` days after install and clears level `i`.
/// Events that would fall past the last representable date are dropped.
pub fn generate_session(user_id: &str, install_date: NaiveDate, num_events: u32) -> Vec<PlayEvent> {
    (0..num_events)
        .map_while(|i| {
            install_date
                .checked_add_days(Days::new(u64::from(i)))
                .map(|play_date| PlayEvent::new(user_id, install_date, play_date, i as Level))
        })
        .collect()
}

/// Seeded source of synthetic users.
#[derive(Debug)]
pub struct LogGenerator {
    config: GeneratorConfig,
    rng: SmallRng,
}

impl LogGenerator {
    /// Creates a generator, seeding from the config or from the OS.
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        if config.start_date > config.end_date {
            return Err(GeneratorError::InvalidDateRange {
                start: config.start_date,
                end: config.end_date,
            });
        }
        if config.min_events > config.max_events {
            return Err(GeneratorError::InvalidSessionRange {
                min: config.min_events,
                max: config.max_events,
            });
        }

        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    /// Creates a generator with default settings and a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            config: GeneratorConfig {
                seed: Some(seed),
                ..GeneratorConfig::default()
            },
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Uniform install date inside the inclusive window.
    pub fn random_install_date(&mut self) -> NaiveDate {
        let span = (self.config.end_date - self.config.start_date).num_days();
        let offset = self.rng.gen_range(0..=span.max(0)) as u64;
        self.config
            .start_date
            .checked_add_days(Days::new(offset))
            .unwrap_or(self.config.end_date)
    }

    /// Random 128-bit user token in UUID v4 layout.
    pub fn random_user_id(&mut self) -> String {
        let bytes: [u8; 16] = self.rng.gen();
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string()
    }

    /// Uniform session length inside the configured range.
    pub fn random_session_length(&mut self) -> u32 {
        self.rng
            .gen_range(self.config.min_events..=self.config.max_events)
    }

    /// Generates one synthetic user's events.
    pub fn generate_user(&mut self) -> Vec<PlayEvent> {
        let user_id = self.random_user_id();
        let install_date = self.random_install_date();
        let num_events = self.random_session_length();
        debug!(%user_id, %install_date, num_events, "generated user");
        generate_session(&user_id, install_date, num_events)
    }

    /// Generates events for every configured user, user by user.
    pub fn generate(&mut self) -> Vec<PlayEvent> {
        (0..self.config.users)
            .flat_map(|_| self.generate_user())
            .collect()
    }
}

/// Parses a user token back into a UUID.
pub fn parse_user_id(user_id: &str) -> Option<Uuid> {
    Uuid::parse_str(user_id).ok()
}

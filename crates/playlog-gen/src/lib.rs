//! Synthetic play-log generation.
//!
//! Produces play logs in the same CSV layout the churn tools read, for
//! exercising the funnel and timing reports without production data.
//!
//! # Example
//!
//! ```
//! use playlog_gen::{generate_session, LogGenerator};
//!
//! let install = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let session = generate_session("user-1", install, 3);
//! assert_eq!(session[2].level_cleared, 2);
//!
//! let mut generator = LogGenerator::with_seed(42);
//! let events = generator.generate_user();
//! assert!(!events.is_empty());
//! ```

pub mod config;
pub mod generator;

pub use config::{ConfigError, GeneratorConfig, GeneratorFile};
pub use generator::{generate_session, parse_user_id, GeneratorError, LogGenerator};

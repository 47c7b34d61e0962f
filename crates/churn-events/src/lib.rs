//! Shared play-log types and serialization for the level churn tools.
//!
//! This crate contains pure data structures and the play-log CSV codec, with
//! no analysis logic. It is a dependency for the other crates in the
//! workspace.

pub mod date;
pub mod event;
pub mod playlog;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export date helpers
pub use date::{days_between, format_date, parse_date, DATE_FORMAT};

// Re-export event types
pub use event::{Level, PlayEvent};

// Re-export play-log codec
pub use playlog::{
    read_playlog, read_playlog_file, write_playlog, write_playlog_file, ParseError,
    PlaylogColumns, PLAYLOG_HEADER,
};

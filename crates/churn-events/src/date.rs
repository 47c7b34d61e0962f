//! Calendar date helpers.
//!
//! Play logs carry plain `YYYY-MM-DD` dates. Timestamps with a time-of-day
//! suffix are accepted on input and truncated to their date.
//!
//! # Example
//!
//! ```
//! use churn_events::{days_between, parse_date};
//!
//! let a = parse_date("2024-01-01").unwrap();
//! let b = parse_date("2024-01-04 13:45:00").unwrap();
//! assert_eq!(days_between(a, b), 3);
//! ```

use chrono::{NaiveDate, NaiveDateTime};

/// Canonical date format used by play logs.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a play-log date.
///
/// Returns `None` when the value matches neither `YYYY-MM-DD` nor
/// `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
                .ok()
                .map(|dt| dt.date())
        })
}

/// Formats a date the way play logs store it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Signed number of days from `start` to `end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        let date = parse_date("2024-03-31").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn test_parse_datetime_truncates() {
        let date = parse_date(" 2024-02-29 23:59:59 ").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("2023-02-29").is_none());
    }

    #[test]
    fn test_format_round_trips() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_date(date), "2024-01-05");
        assert_eq!(parse_date(&format_date(date)), Some(date));
    }

    #[test]
    fn test_days_between_is_signed() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(days_between(a, b), -3);
        assert_eq!(days_between(b, a), 3);
        assert_eq!(days_between(a, a), 0);
    }
}

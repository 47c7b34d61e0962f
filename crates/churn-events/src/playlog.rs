//! Play-log CSV codec.
//!
//! Play logs are comma-separated files with one [`PlayEvent`] per line:
//!
//! ```text
//! userid,install_date,play_date,level_cleared
//! 6f1c...,2024-01-03,2024-01-05,2
//! ```
//!
//! The header row is optional. When present, column order is taken from it;
//! otherwise the canonical order above is assumed. Reading stops at the first
//! malformed record and reports its 1-based line number. A field holding a
//! comma or a double quote is written wrapped in double quotes, with inner
//! quotes doubled.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::date::{format_date, parse_date};
use crate::event::{Level, PlayEvent};

/// Canonical header line for play logs.
pub const PLAYLOG_HEADER: &str = "userid,install_date,play_date,level_cleared";

/// Errors raised while reading a play log.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The header row does not name a required column.
    #[error("header is missing required column '{0}'")]
    MissingColumn(&'static str),
    /// A record has no value for a required column.
    #[error("line {line}: missing value for '{column}'")]
    MissingField { line: usize, column: &'static str },
    /// `level_cleared` is not a non-negative integer.
    #[error("line {line}: invalid level_cleared '{value}', expected a non-negative integer")]
    InvalidLevel { line: usize, value: String },
    /// A date column could not be parsed.
    #[error("line {line}: invalid {column} '{value}', expected YYYY-MM-DD")]
    InvalidDate {
        line: usize,
        column: &'static str,
        value: String,
    },
    /// Underlying I/O failure.
    #[error("failed to read play log: {0}")]
    Io(#[from] io::Error),
}

/// Column positions of the play-log fields within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylogColumns {
    pub user_id: usize,
    pub install_date: usize,
    pub play_date: usize,
    pub level_cleared: usize,
}

impl Default for PlaylogColumns {
    fn default() -> Self {
        Self {
            user_id: 0,
            install_date: 1,
            play_date: 2,
            level_cleared: 3,
        }
    }
}

impl PlaylogColumns {
    /// Resolves column positions from a header row.
    ///
    /// Extra columns are ignored. `user_id` is accepted as an alias of
    /// `userid`.
    pub fn from_header(line: &str) -> Result<Self, ParseError> {
        let names: Vec<String> = split_record(line)
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        let find = |candidates: &[&str], column: &'static str| {
            names
                .iter()
                .position(|name| candidates.contains(&name.as_str()))
                .ok_or(ParseError::MissingColumn(column))
        };

        Ok(Self {
            user_id: find(&["userid", "user_id"], "userid")?,
            install_date: find(&["install_date"], "install_date")?,
            play_date: find(&["play_date"], "play_date")?,
            level_cleared: find(&["level_cleared"], "level_cleared")?,
        })
    }

    /// Parses a single record.
    pub fn parse_record(&self, line: &str, line_no: usize) -> Result<PlayEvent, ParseError> {
        let fields = split_record(line);
        let field = |index: usize, column: &'static str| {
            fields
                .get(index)
                .map(|value| &**value)
                .filter(|value| !value.is_empty())
                .ok_or(ParseError::MissingField {
                    line: line_no,
                    column,
                })
        };

        let user_id = field(self.user_id, "userid")?;
        let install_date = parse_date_field(field(self.install_date, "install_date")?, "install_date", line_no)?;
        let play_date = parse_date_field(field(self.play_date, "play_date")?, "play_date", line_no)?;

        let raw_level = field(self.level_cleared, "level_cleared")?;
        let level_cleared: Level = raw_level.parse().map_err(|_| ParseError::InvalidLevel {
            line: line_no,
            value: raw_level.to_string(),
        })?;

        Ok(PlayEvent::new(user_id, install_date, play_date, level_cleared))
    }
}

fn parse_date_field(
    value: &str,
    column: &'static str,
    line_no: usize,
) -> Result<chrono::NaiveDate, ParseError> {
    parse_date(value).ok_or_else(|| ParseError::InvalidDate {
        line: line_no,
        column,
        value: value.to_string(),
    })
}

/// Splits a record into trimmed fields.
///
/// Fields may be wrapped in double quotes, in which case commas are kept
/// and a doubled quote stands for one literal quote.
fn split_record(line: &str) -> Vec<Cow<'_, str>> {
    let mut fields = Vec::new();
    let mut rest = line;

    loop {
        let trimmed = rest.trim_start();
        match trimmed.strip_prefix('"') {
            Some(quoted) => {
                let mut value = String::new();
                let mut chars = quoted.char_indices();
                let mut after = "";
                while let Some((i, c)) = chars.next() {
                    if c != '"' {
                        value.push(c);
                    } else if quoted[i + 1..].starts_with('"') {
                        value.push('"');
                        chars.next();
                    } else {
                        after = &quoted[i + 1..];
                        break;
                    }
                }
                fields.push(Cow::Owned(value));
                match after.split_once(',') {
                    Some((_, tail)) => rest = tail,
                    None => break,
                }
            }
            None => match trimmed.split_once(',') {
                Some((field, tail)) => {
                    fields.push(Cow::Borrowed(field.trim()));
                    rest = tail;
                }
                None => {
                    fields.push(Cow::Borrowed(trimmed.trim()));
                    break;
                }
            },
        }
    }

    fields
}

/// Quotes a field that holds a comma or a double quote.
fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn is_header(line: &str) -> bool {
    split_record(line).iter().any(|field| {
        ["userid", "user_id", "level_cleared"]
            .iter()
            .any(|name| field.eq_ignore_ascii_case(name))
    })
}

/// Reads all play events from a buffered reader.
///
/// Blank lines are skipped. An empty input yields an empty vector.
pub fn read_playlog<R: BufRead>(reader: R) -> Result<Vec<PlayEvent>, ParseError> {
    let mut columns: Option<PlaylogColumns> = None;
    let mut events = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let cols = match columns {
            Some(cols) => cols,
            None => {
                if is_header(&line) {
                    columns = Some(PlaylogColumns::from_header(&line)?);
                    continue;
                }
                let cols = PlaylogColumns::default();
                columns = Some(cols);
                cols
            }
        };

        events.push(cols.parse_record(&line, line_no)?);
    }

    Ok(events)
}

/// Reads all play events from a CSV file.
pub fn read_playlog_file(path: &Path) -> Result<Vec<PlayEvent>, ParseError> {
    let file = File::open(path)?;
    let events = read_playlog(BufReader::new(file))?;
    debug!(path = %path.display(), events = events.len(), "loaded play log");
    Ok(events)
}

/// Writes play events as CSV rows, optionally preceded by the header.
pub fn write_playlog<W: Write>(
    writer: &mut W,
    events: &[PlayEvent],
    include_header: bool,
) -> io::Result<()> {
    if include_header {
        writeln!(writer, "{}", PLAYLOG_HEADER)?;
    }
    for event in events {
        writeln!(
            writer,
            "{},{},{},{}",
            escape_field(&event.user_id),
            format_date(event.install_date),
            format_date(event.play_date),
            event.level_cleared
        )?;
    }
    Ok(())
}

/// Writes play events to a CSV file with a header row.
pub fn write_playlog_file(path: &Path, events: &[PlayEvent]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_playlog(&mut writer, events, true)?;
    writer.flush()
}

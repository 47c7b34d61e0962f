//! Report output.
//!
//! A [`ChurnReport`] bundles the funnel and the optional timing rows. It can
//! be rendered as console tables, written as CSV files, or serialized to
//! JSON.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::OutputConfig;
use crate::funnel::LevelFunnelStat;
use crate::timing::LevelTimingStat;

/// Header row of the funnel CSV.
pub const FUNNEL_CSV_HEADER: &str =
    "level,total_users_reached,users_stopped,churn_rate,retention_rate,progression_rate";

/// Header row of the timing CSV.
pub const TIMING_CSV_HEADER: &str = "level,avg_days_to_complete,users";

/// File format for written reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One CSV file per report
    #[default]
    Csv,
    /// A single JSON document holding both reports
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}

/// Errors that can occur during output operations.
#[derive(Debug, Error)]
pub enum OutputError {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Funnel and timing results from one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnReport {
    /// Engine that produced the rows
    pub engine: String,
    /// Level funnel, ascending by level
    pub funnel: Vec<LevelFunnelStat>,
    /// Time-to-next-level rows, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<Vec<LevelTimingStat>>,
}

impl ChurnReport {
    /// Number of distinct users, recovered from the funnel.
    ///
    /// Every user stops at exactly one level.
    pub fn total_users(&self) -> u64 {
        self.funnel.iter().map(|row| row.users_stopped).sum()
    }

    /// Writes the funnel as CSV.
    pub fn write_funnel_csv<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
        writeln!(writer, "{}", FUNNEL_CSV_HEADER)?;
        for row in &self.funnel {
            writeln!(
                writer,
                "{},{},{},{:.2},{:.2},{}",
                row.level,
                row.users_reached,
                row.users_stopped,
                row.churn_rate,
                row.retention_rate,
                row.progression_rate
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_default()
            )?;
        }
        Ok(())
    }

    /// Writes the timing rows as CSV. Writes only the header when timing
    /// was not computed.
    pub fn write_timing_csv<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
        writeln!(writer, "{}", TIMING_CSV_HEADER)?;
        for row in self.timing.iter().flatten() {
            writeln!(
                writer,
                "{},{:.1},{}",
                row.level, row.avg_days_to_complete, row.users
            )?;
        }
        Ok(())
    }

    /// Serializes the entire report to JSON.
    pub fn to_json(&self) -> Result<String, OutputError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report files described by `config` and returns their paths.
    ///
    /// Creates the output directory if it doesn't exist. CSV output writes
    /// the funnel file and, when timing was computed, the timing file. JSON
    /// output writes one document named after the funnel file.
    pub fn write_all(&self, config: &OutputConfig) -> Result<Vec<PathBuf>, OutputError> {
        fs::create_dir_all(&config.dir)?;
        let mut written = Vec::new();

        match config.format {
            OutputFormat::Csv => {
                let churn_path = config.dir.join(&config.churn_file);
                write_file(&churn_path, |w| self.write_funnel_csv(w))?;
                written.push(churn_path);

                if self.timing.is_some() {
                    let timing_path = config.dir.join(&config.timing_file);
                    write_file(&timing_path, |w| self.write_timing_csv(w))?;
                    written.push(timing_path);
                }
            }
            OutputFormat::Json => {
                let json_path = config
                    .dir
                    .join(Path::new(&config.churn_file).with_extension("json"));
                write_file(&json_path, |w| {
                    serde_json::to_writer_pretty(&mut *w, self)?;
                    writeln!(w)?;
                    Ok(())
                })?;
                written.push(json_path);
            }
        }

        for path in &written {
            info!(path = %path.display(), "wrote report");
        }
        Ok(written)
    }

    /// Funnel rendered as a fixed-width table.
    pub fn funnel_table(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .funnel
            .iter()
            .map(|row| {
                vec![
                    row.level.to_string(),
                    row.users_reached.to_string(),
                    row.users_stopped.to_string(),
                    format!("{:.2}", row.churn_rate),
                    format!("{:.2}", row.retention_rate),
                    row.progression_rate
                        .map(|p| format!("{:.2}", p))
                        .unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();
        render_table(&FUNNEL_CSV_HEADER.split(',').collect::<Vec<_>>(), &rows)
    }

    /// Timing rows rendered as a fixed-width table.
    pub fn timing_table(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .timing
            .iter()
            .flatten()
            .map(|row| {
                vec![
                    row.level.to_string(),
                    format!("{:.1}", row.avg_days_to_complete),
                    row.users.to_string(),
                ]
            })
            .collect();
        render_table(&TIMING_CSV_HEADER.split(',').collect::<Vec<_>>(), &rows)
    }
}

fn write_file<F>(path: &Path, write: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), OutputError>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Right-aligns every column to its widest cell.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = format_line(headers.iter().copied(), &widths);
    out.push('\n');
    for row in rows {
        out.push_str(&format_line(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{:>width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(" ")
}

//! Synthetic play-log generator CLI.
//!
//! Examples:
//!   playlog_gen --users 1000 --seed 42 --output playlog.csv
//!   playlog_gen --start-date 2024-04-01 --end-date 2024-06-30 --no-header >> playlog.csv

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use churn_events::{parse_date, write_playlog};
use clap::Parser;
use playlog_gen::{GeneratorConfig, GeneratorFile, LogGenerator};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;

/// Command line arguments for the generator
#[derive(Parser, Debug)]
#[command(name = "playlog_gen")]
#[command(about = "Generate synthetic game play logs for churn analysis")]
struct Args {
    /// Number of users to generate
    #[arg(long, short)]
    users: Option<usize>,

    /// Random seed for reproducible output
    #[arg(long, short)]
    seed: Option<u64>,

    /// First possible install date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    start_date: Option<NaiveDate>,

    /// Last possible install date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    end_date: Option<NaiveDate>,

    /// Shortest session, in events
    #[arg(long)]
    min_events: Option<u32>,

    /// Longest session, in events
    #[arg(long)]
    max_events: Option<u32>,

    /// Output file (stdout when omitted)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Omit the CSV header row, for appending to an existing log
    #[arg(long)]
    no_header: bool,

    /// TOML config file with a [generator] section
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    if args.print_default_config {
        print!("{}", GeneratorFile::default().to_toml()?);
        return Ok(());
    }

    let config = load_config(&args)?;
    let mut generator = LogGenerator::new(config).context("invalid generator settings")?;
    let events = generator.generate();

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_playlog(&mut writer, &events, !args.no_header)?;
            writer.flush()?;
            info!(
                users = generator.config().users,
                events = events.len(),
                path = %path.display(),
                "wrote play log"
            );
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            write_playlog(&mut writer, &events, !args.no_header)?;
            writer.flush()?;
            info!(users = generator.config().users, events = events.len(), "wrote play log");
        }
    }

    Ok(())
}

/// Reads the config file and applies command line overrides.
fn load_config(args: &Args) -> anyhow::Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            GeneratorFile::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
                .generator
        }
        None => GeneratorConfig::default(),
    };

    if let Some(users) = args.users {
        config.users = users;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(start) = args.start_date {
        config.start_date = start;
    }
    if let Some(end) = args.end_date {
        config.end_date = end;
    }
    if let Some(min) = args.min_events {
        config.min_events = min;
    }
    if let Some(max) = args.max_events {
        config.max_events = max;
    }

    Ok(config)
}

/// Installs a compact stderr subscriber so stdout carries only CSV.
fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .context("invalid RUST_LOG environment variable")?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "playlog_gen={level},churn_events={level}",
            level = level
        ))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(io::stderr);

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global default subscriber")?;
    Ok(())
}

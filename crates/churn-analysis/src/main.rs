//! Level churn report CLI.
//!
//! Examples:
//!   level_churn --input playlog.csv
//!   level_churn --input game_data.csv --engine sqlite --database game_analytics.db
//!   level_churn --engine sqlite --database game_analytics.db --format json --output-dir reports/

use std::path::{Path, PathBuf};

use anyhow::Context;
use churn_analysis::{
    analyze, default_config_toml, ChurnConfig, EngineKind, OutputFormat, DEFAULT_CONFIG_PATH,
};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;

/// Command line arguments for the churn report
#[derive(Parser, Debug)]
#[command(name = "level_churn")]
#[command(about = "Per-level churn, retention and progression from game play logs")]
struct Args {
    /// Play log CSV (userid,install_date,play_date,level_cleared)
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// TOML config file (defaults to churn.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Aggregation engine
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Directory for report files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Report file format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Skip the time-to-next-level report
    #[arg(long)]
    no_timing: bool,

    /// Do not print report tables
    #[arg(long)]
    quiet: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    if args.print_default_config {
        print!("{}", default_config_toml()?);
        return Ok(());
    }

    let config = load_config(&args)?;
    debug!(?config, "resolved configuration");

    let input = args
        .input
        .clone()
        .or_else(|| config.analysis.database.is_none().then(|| PathBuf::from("playlog.csv")));

    let report = analyze(&config.analysis, input.as_deref()).with_context(|| match &input {
        Some(path) => format!("analysis of {} failed", path.display()),
        None => "analysis failed".to_string(),
    })?;

    if config.output.print_tables {
        println!();
        println!("Level churn ({} engine, {} users):", report.engine, report.total_users());
        print!("{}", report.funnel_table());
        if report.timing.is_some() {
            println!();
            println!("Average days to complete each level:");
            print!("{}", report.timing_table());
        }
    }

    let written = report
        .write_all(&config.output)
        .context("failed to write reports")?;
    info!(files = written.len(), "done");
    Ok(())
}

/// Reads the config file and applies command line overrides.
fn load_config(args: &Args) -> anyhow::Result<ChurnConfig> {
    let mut config = match &args.config {
        Some(path) => ChurnConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            ChurnConfig::from_file(Path::new(DEFAULT_CONFIG_PATH))
                .with_context(|| format!("failed to load config {}", DEFAULT_CONFIG_PATH))?
        }
        None => ChurnConfig::default(),
    };

    if let Some(engine) = args.engine {
        config.analysis.engine = engine;
    }
    if let Some(database) = &args.database {
        config.analysis.database = Some(database.clone());
    }
    if args.no_timing {
        config.analysis.include_timing = false;
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.quiet {
        config.output.print_tables = false;
    }

    Ok(config)
}

/// Installs a compact stderr subscriber filtered by RUST_LOG or `level`.
fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .context("invalid RUST_LOG environment variable")?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "churn_analysis={level},churn_events={level},level_churn={level}",
            level = level
        ))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global default subscriber")?;
    Ok(())
}

//! CLI entry point for the Vélib ingestion tool.
//!
//! Provides subcommands for the scheduled polling run, a single manual cycle,
//! the read-only station/history queries, and schema bootstrap.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use velib_ingest::{
    config::{DatabaseConfig, FeedConfig, ScheduleConfig},
    connect::connect,
    fetch::{BasicClient, FeedFetcher},
    output::{print_json, print_pretty, write_csv},
    pipeline::{CycleOutcome, Pipeline},
    scheduler::Scheduler,
    store::Store,
};

#[derive(Parser)]
#[command(name = "velib_ingest")]
#[command(about = "Poll the Vélib availability feed into a database", long_about = None)]
struct Cli {
    #[command(flatten)]
    db: DatabaseConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed on a fixed period for the configured duration
    Run {
        #[command(flatten)]
        feed: FeedConfig,

        #[command(flatten)]
        schedule: ScheduleConfig,
    },
    /// Run a single ingestion cycle, writing stations and observations
    Once {
        #[command(flatten)]
        feed: FeedConfig,
    },
    /// List all known stations
    Stations {
        /// CSV file to write instead of logging
        #[arg(short, long)]
        output: Option<String>,

        /// Log as JSON rather than debug format
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the availability history of one station
    History {
        #[arg(value_name = "STATIONCODE")]
        stationcode: String,

        /// CSV file to write instead of logging
        #[arg(short, long)]
        output: Option<String>,

        /// Log as JSON rather than debug format
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Create the station and historic tables if they do not exist
    InitSchema,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/velib_ingest.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("velib_ingest.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    // No ingestion without a session: exhausting the retries ends the process here.
    let store = connect(&cli.db.url()?, cli.db.retry_policy()).await?;

    match cli.command {
        Commands::Run { feed, schedule } => {
            let pipeline = pipeline(&feed, store)?;
            let mut scheduler = Scheduler::new(schedule.period(), schedule.duration())?;
            pipeline.run(&mut scheduler).await?;
        }
        Commands::Once { feed } => {
            let pipeline = pipeline(&feed, store)?;
            if let CycleOutcome::Failed(e) = pipeline.run_cycle(true).await {
                return Err(e);
            }
        }
        Commands::Stations { output, json } => {
            let rows = store.stations().await?;
            info!(rows = rows.len(), "Stations loaded");
            emit(&rows, output.as_deref(), json)?;
        }
        Commands::History {
            stationcode,
            output,
            json,
        } => {
            let rows = store.history(&stationcode).await?;
            info!(stationcode = %stationcode, rows = rows.len(), "History loaded");
            emit(&rows, output.as_deref(), json)?;
        }
        Commands::InitSchema => {
            store.ensure_schema().await?;
            info!("Schema ready");
        }
    }

    Ok(())
}

fn pipeline(feed: &FeedConfig, store: Box<dyn Store>) -> Result<Pipeline<BasicClient>> {
    let client = BasicClient::with_timeout(feed.http_timeout())?;
    let fetcher = FeedFetcher::new(client, feed.url()?);
    info!(url = %fetcher.url(), "Feed configured");
    Ok(Pipeline::new(fetcher, store))
}

fn emit<T>(rows: &[T], output: Option<&str>, json: bool) -> Result<()>
where
    T: serde::Serialize + std::fmt::Debug,
{
    match output {
        Some(path) => {
            write_csv(path, rows)?;
            info!(path, "CSV written");
        }
        None if json => print_json(rows)?,
        None => print_pretty(rows),
    }
    Ok(())
}

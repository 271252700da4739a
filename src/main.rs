mod config;
mod engine;
mod identity;
mod ledger;
mod models;
mod storage;
mod types;

use std::io::{stderr, stdout, BufWriter, Write};
use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::config::Settings;
use crate::engine::{CommandEngine, ReportRow};
use crate::storage::{FileStorage, MemoryStorage, Storage};
use crate::types::format_amount;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: local-bank [script].csv [log_level:optional] > [report].csv");
        eprintln!("Available log levels: error, warn, info, debug, trace (default: error)");
        eprintln!("Settings are read from BANK_* environment variables or a .env file");
        exit(1);
    }

    let path = &args[1];
    let log_level = args.get(2)
        .map(|s| parse_log_level(s)).unwrap_or_else(|| LevelFilter::ERROR);

    setup_logging(log_level);

    let settings = Settings::from_env()?;

    let rows = match settings.store_path.clone() {
        Some(store_path) => {
            let storage = Arc::new(FileStorage::open(&store_path)?);
            info!("Using store at [{}]", storage.path().display());
            run_script(storage, settings, path).await?
        }
        None => run_script(Arc::new(MemoryStorage::new()), settings, path).await?
    };

    write_report_to_stdout(&rows)?;

    Ok(())
}

async fn run_script<S: Storage>(storage: Arc<S>, settings: Settings, path: &str) -> Result<Vec<ReportRow>> {
    let engine = CommandEngine::new(storage, settings)?;

    let timer = Instant::now();
    engine.run(path).await?;
    let duration = timer.elapsed();

    info!("Processed script in: {duration:?}");

    Ok(engine.report()?)
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'error'", level);
            LevelFilter::ERROR
        }
    }
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout carries the report, so logs go to stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

fn write_report_to_stdout(rows: &[ReportRow]) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    writeln!(output, "email,account_number,type,balance,reconciled")?;

    for row in rows {
        writeln!(
            output,
            "{},{},{},{},{}",
            row.email,
            row.account_number,
            row.account_type,
            format_amount(row.balance),
            row.reconciled
        )?;
    }

    output.flush()?;

    Ok(())
}

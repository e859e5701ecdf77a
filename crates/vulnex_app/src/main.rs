//! `discover-files`: probe base URLs for interesting paths and store what turns up.
//!
//! Exit codes: 0 when the scan ran to completion, 2 when it could not start.

mod cli;
mod config;
mod output;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use scan_logging::{scan_info, LogDestination};
use vulnex_engine::{Engine, MemorySink, ResultSink, SqliteSink};

use cli::Cli;
use output::{ConsoleProgress, OutputMode};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    scan_logging::initialize(destination, scan_logging::level_for_verbosity(cli.verbose));

    let candidates = config::load_candidates(&cli, io::stdin().lock())?;
    let engine = Engine::new(config::engine_config(&cli)).context("building HTTP client")?;

    let sink: Arc<dyn ResultSink> = if cli.dry_run {
        scan_info!("Dry run: findings are kept in memory only");
        Arc::new(MemorySink::new())
    } else {
        let sink = SqliteSink::open(&cli.db)
            .with_context(|| format!("opening database {}", cli.db.display()))?;
        Arc::new(sink)
    };

    let mode = if cli.jsonl {
        OutputMode::JsonLines
    } else {
        OutputMode::Lines
    };

    eprintln!(
        "Scanning {} candidate URLs with {} workers...",
        candidates.len(),
        engine.config().worker_count
    );
    let summary = engine
        .run(&candidates, sink, Arc::new(ConsoleProgress::new(mode)))
        .await;
    eprintln!("Done: {summary}");

    Ok(0)
}

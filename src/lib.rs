// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod event;
pub mod fs;
pub mod github;
pub mod logging;
pub mod state;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::Settings;
use crate::engine::{shutdown_channel, MonitorLoop, PollCycle, TokioSleeper};
use crate::event::LineSink;
use crate::fs::RealFileSystem;
use crate::github::GithubClient;
use crate::state::StateStore;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings (config file + CLI overrides)
/// - the state store on the real filesystem
/// - the GitHub client and the stdout event sink
/// - Ctrl-C handling
/// - the monitor loop
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = Settings::resolve(&args)?;
    let store = StateStore::new(&settings.config.monitor.state_file, Arc::new(RealFileSystem));

    if settings.dry_run {
        print_dry_run(&settings, &store);
        return Ok(());
    }

    let token = settings.token()?;
    let github = &settings.config.github;
    let client = GithubClient::new(&github.api_url, &token, github.request_timeout)?;

    let cycle = PollCycle::new(
        client,
        LineSink::stdout(),
        store,
        settings.repo.clone(),
        settings.config.monitor.page_size,
    );

    // Ctrl-C → graceful shutdown.
    let (handle, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received; shutting down");
        handle.trigger();
    });

    let monitor = MonitorLoop::new(cycle, TokioSleeper, shutdown, settings.monitor_options());
    let state = monitor.run().await?;

    debug!(
        watermark = state.watermark,
        in_flight = state.in_flight_runs.len(),
        "final state"
    );
    Ok(())
}

/// Print resolved settings and the persisted state; touches no network.
fn print_dry_run(settings: &Settings, store: &StateStore) {
    let monitor = &settings.config.monitor;
    let github = &settings.config.github;

    println!("runwatch dry-run");
    println!("  repo = {}", settings.repo);
    println!("  config = {}", settings.config_path.display());
    println!("  monitor.poll_interval = {:?}", monitor.poll_interval);
    println!(
        "  monitor.backoff = {:?} .. {:?}",
        monitor.backoff_floor, monitor.backoff_ceiling
    );
    println!("  monitor.page_size = {}", monitor.page_size);
    println!("  monitor.state_file = {}", monitor.state_file.display());
    println!("  github.api_url = {}", github.api_url);
    println!("  github.token_env = {}", github.token_env);
    println!("  github.request_timeout = {:?}", github.request_timeout);
    println!();

    let state = store.load();
    println!("state:");
    println!("  last_processed_run_id = {}", state.watermark);
    println!("  in_flight_runs ({}):", state.in_flight_runs.len());
    for (id, run) in state.in_flight_runs.iter() {
        let conclusion = run.conclusion.as_deref().unwrap_or("-");
        println!(
            "    - {id}: status={} conclusion={conclusion} jobs={}",
            run.status,
            run.jobs.len()
        );
    }
    if !state.retry_runs.is_empty() {
        println!("  retry_runs: {:?}", state.retry_runs);
    }

    debug!("dry-run complete (no API calls)");
}

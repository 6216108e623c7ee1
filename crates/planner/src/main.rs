use anyhow::{Context, Result};
use drone::client::{LoopbackChannel, SimulatedFleet};
use tracing::info;

use planner::config::{LogFormat, LogOutput, PlannerConfig};
use planner::coordinator::SwarmCoordinator;
use planner::fabric::StaticFabric;
use planner::runtime::{run_realtime, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    // Phase 1: Basic tracing so we can log during config loading
    // Uses set_default (thread-local) so it can be replaced by Phase 2's global subscriber
    let basic_tracing = init_tracing_basic();

    info!("Starting swarm planner v{}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => PlannerConfig::load_from(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => PlannerConfig::load().context("Failed to load configuration")?,
    };

    config.validate().context("Configuration validation failed")?;

    // Phase 2: Re-initialize tracing with config (format, level)
    drop(basic_tracing);
    init_tracing_from_config(&config)?;

    info!(
        drones = config.swarm.num_drones,
        realtime = config.timing.realtime,
        stop_time_secs = config.timing.stop_time_secs,
        "Configuration loaded successfully"
    );

    let channel = LoopbackChannel::new();
    let fleet = SimulatedFleet::new(config.fleet.speed);
    let fabric = StaticFabric::new(config.network.subnet, config.network.port);
    let realtime = config.timing.realtime;

    let mut coord = SwarmCoordinator::new(config, channel, fleet)
        .context("Failed to lay out the swarm")?;

    let report = if realtime {
        coord.initialize_mobility();
        coord.initialize_sockets(&fabric).context("Failed to set up the network fabric")?;
        coord.set_leader_explore_path();
        run_realtime(&mut coord, shutdown_signal()).await.context("Mission failed")?
    } else {
        coord.start_simul(&fabric).context("Mission failed")?
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize mission report")?
    );

    info!("Planner shut down gracefully");
    Ok(())
}

/// Phase 1: thread-local subscriber used while configuration loads.
fn init_tracing_basic() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,planner=debug"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Phase 2: global subscriber built from the logging section.
/// Logs go to stderr so stdout carries only the report.
fn init_tracing_from_config(config: &PlannerConfig) -> Result<()> {
    use std::sync::Arc;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Prefer RUST_LOG env var, fall back to config level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match (&config.logging.format, &config.logging.output) {
        (LogFormat::Json, LogOutput::Stdout) => {
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Json, LogOutput::File { path }) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Pretty, LogOutput::Stdout) => {
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Pretty, LogOutput::File { path }) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
    Ok(())
}

fn open_log_file(path: &str) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{}'", path))
}

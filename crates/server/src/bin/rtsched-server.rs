//! rtsched-server: periodic task scheduling simulator.
//!
//! `serve` runs the paced tick loop and accepts `ADD`/`STATUS`/`LIST`
//! sessions over TCP until SIGINT/SIGTERM, then prints the final report.
//! `simulate` runs a task file offline and prints a Gantt chart.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use rtsched_core::config::load_dotenv;
use rtsched_core::loader::load_tasks;
use rtsched_core::{Algorithm, RtschedConfig};
use rtsched_engine::{GanttChart, Scheduler, TaskRegistry, TickSnapshot};
use rtsched_server::SessionListener;

// ── CLI ─────────────────────────────────────────────────────────────

/// RM/EDF scheduling simulator with a live task-injection server.
#[derive(Parser, Debug)]
#[command(name = "rtsched-server", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the tick loop and accept client sessions.
    Serve(ServeArgs),
    /// Run a task file for a fixed number of ticks without pacing.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to rtsched.toml (defaults to ./rtsched.toml when present).
    #[arg(long, env = "RTSCHED_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// RM or EDF.
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// JSON task file admitted at tick 0.
    #[arg(long)]
    tasks: Option<PathBuf>,

    /// Milliseconds per tick.
    #[arg(long)]
    tick_ms: Option<u64>,
}

impl ServeArgs {
    fn apply(&self, config: &mut RtschedConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(algorithm) = self.algorithm {
            config.engine.algorithm = algorithm;
        }
        if let Some(tasks) = &self.tasks {
            config.tasks.file = Some(tasks.clone());
        }
        if let Some(ms) = self.tick_ms {
            config.engine.tick_interval_ms = ms;
        }
    }
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// RM or EDF.
    #[arg(long, default_value = "RM")]
    algorithm: Algorithm,

    /// JSON task file.
    #[arg(long)]
    tasks: PathBuf,

    #[arg(long, default_value_t = 20)]
    ticks: u64,

    /// Also print the event log.
    #[arg(long)]
    events: bool,

    /// Print the final report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Simulate(args) => simulate(args),
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config =
        RtschedConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let registry = TaskRegistry::new(config.engine.algorithm);
    if let Some(path) = &config.tasks.file {
        admit_initial(&registry, path)?;
    }

    let mut scheduler = Scheduler::new(registry.clone())
        .with_tick_interval(config.engine.tick_interval())
        .with_snapshot_buffer(config.engine.snapshot_buffer);
    let engine = scheduler.handle();
    tokio::spawn(log_snapshots(scheduler.subscribe()));

    let listener = SessionListener::bind(config.server.bind_addr(), registry)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr()))?;
    info!(addr = %listener.local_addr()?, "rtsched server ready");

    let (stop_tx, stop_rx) = watch::channel(false);
    let listener_task = tokio::spawn(listener.run(stop_rx));
    let mut engine_task = tokio::spawn(async move {
        let result = scheduler.run().await;
        (scheduler, result)
    });

    // The tick loop only returns early on an invariant violation.
    let finished = tokio::select! {
        signal = shutdown_signal() => {
            signal.context("failed to install signal handlers")?;
            info!("shutdown signal received");
            None
        }
        joined = &mut engine_task => Some(joined?),
    };

    engine.shutdown();
    let _ = stop_tx.send(true);
    let (scheduler, result) = match finished {
        Some(done) => done,
        None => engine_task.await?,
    };
    listener_task.await?;

    println!("{}", scheduler.report());
    result.context("tick loop aborted")?;
    Ok(())
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let registry = TaskRegistry::new(args.algorithm);
    admit_initial(&registry, &args.tasks)?;

    let mut scheduler = Scheduler::new(registry);
    let snapshots = scheduler.simulate(args.ticks).context("simulation aborted")?;
    let report = scheduler.report();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut chart = GanttChart::new();
    chart.extend(&snapshots);
    println!("{}", chart.render());
    if args.events {
        println!("{}", chart.render_events());
    }
    println!("{report}");
    Ok(())
}

/// Load the initial task file into the registry; all of it lands at tick 0.
fn admit_initial(registry: &TaskRegistry, path: &Path) -> Result<()> {
    let definitions =
        load_tasks(path).with_context(|| format!("failed to load tasks from {}", path.display()))?;
    let count = definitions.len();
    for definition in definitions {
        registry.add_definition(definition)?;
    }
    info!(count, path = %path.display(), "initial tasks admitted");
    Ok(())
}

/// Log one compact Gantt column per tick at debug level.
async fn log_snapshots(mut rx: broadcast::Receiver<Arc<TickSnapshot>>) {
    loop {
        match rx.recv().await {
            Ok(snapshot) => {
                let cells: String = snapshot
                    .tasks
                    .iter()
                    .map(|t| format!(" {}:{}", t.task, t.symbol().as_char()))
                    .collect();
                debug!(tick = snapshot.tick, running = ?snapshot.running, "{}", cells.trim_start());
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "snapshot logger lagging");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C elsewhere.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

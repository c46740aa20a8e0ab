//! Terminal front end for the vehicle telemetry simulator
//!
//! Reads driver commands from stdin, prints a text dashboard and stops on
//! `quit`, Ctrl-C, or after an optional duration.

mod commands;
mod display;

use std::future::Future;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vehicle_telemetry_core::config::SimConfig;
use vehicle_telemetry_core::runtime::{Simulator, SimulatorHandle};
use vehicle_telemetry_core::unit_conversion::UnitSystem;

use commands::{Command, HELP};
use display::{render_line, TerminalDisplay};

#[derive(Parser, Debug)]
#[command(name = "vehicle-telemetry")]
#[command(about = "Vehicle longitudinal dynamics and telemetry simulator", long_about = None)]
struct Args {
    /// JSON config file; missing fields use defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Telemetry log file (.csv or .jsonl)
    #[arg(long, value_name = "FILE")]
    log_path: Option<PathBuf>,

    /// Seed for the sensor model
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many seconds (0 = run until quit)
    #[arg(long, value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Shift gears automatically
    #[arg(long)]
    auto_shift: bool,

    /// Units shown on the dashboard
    #[arg(long, value_enum, default_value = "metric")]
    units: Units,

    /// Print one dashboard line every N refreshes (0 = never)
    #[arg(long, default_value = "10")]
    print_every: u32,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Units {
    Metric,
    Imperial,
}

impl From<Units> for UnitSystem {
    fn from(units: Units) -> Self {
        match units {
            Units::Metric => UnitSystem::Metric,
            Units::Imperial => UnitSystem::Imperial,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SimConfig::default(),
    };

    if let Some(path) = &args.log_path {
        config.telemetry.log_path = Some(path.clone());
    }
    if args.seed.is_some() {
        config.sensors.seed = args.seed;
    }
    if args.auto_shift {
        config.vehicle.auto_shift = true;
    }
    config.validate()?;
    Ok(config)
}

// Stdin is read on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(32);
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader")?;
    Ok(rx)
}

/// Handle one input line; returns `false` once the user asked to quit
fn handle_line(line: &str, handle: &SimulatorHandle, units: UnitSystem) -> bool {
    if line.trim().is_empty() {
        return true;
    }
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            println!("{e} (type 'help')");
            return true;
        }
    };

    match command.apply(&handle.controls()) {
        Ok(true) => {}
        Ok(false) => match command {
            Command::Status => println!("{}", render_line(&handle.latest_frame(), units)),
            Command::Help => println!("{HELP}"),
            Command::Quit => return false,
            _ => {}
        },
        Err(e) => println!("{e}"),
    }
    true
}

/// Why the command loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Quit,
    InputClosed,
    Deadline,
    Interrupted,
    SimulatorStopped,
}

/// Feed input lines to the simulator until something asks it to stop
///
/// `interrupt` is polled across every iteration, so a signal that lands while
/// a line is being handled is not lost.
async fn run_until_stop(
    mut lines: mpsc::Receiver<String>,
    handle: &SimulatorHandle,
    units: UnitSystem,
    duration: u64,
    interrupt: impl Future<Output = ()>,
) -> StopReason {
    let deadline = async {
        if duration > 0 {
            tokio::time::sleep(Duration::from_secs(duration)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(interrupt);

    let mut input_open = true;
    loop {
        tokio::select! {
            line = lines.recv(), if input_open => match line {
                Some(line) => {
                    if !handle_line(&line, handle, units) {
                        return StopReason::Quit;
                    }
                }
                None => {
                    if duration == 0 {
                        return StopReason::InputClosed;
                    }
                    info!("Input closed, running until the deadline");
                    input_open = false;
                }
            },
            _ = &mut deadline => return StopReason::Deadline,
            _ = &mut interrupt => return StopReason::Interrupted,
            _ = handle.stopped() => {
                warn!("Simulator stopped unexpectedly");
                return StopReason::SimulatorStopped;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = load_config(&args)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let units = UnitSystem::from(args.units);
    let log_path = config.telemetry.resolved_log_path();

    let mut simulator = Simulator::new(config)?;
    if args.print_every > 0 {
        simulator = simulator.with_display(Box::new(TerminalDisplay::new(units, args.print_every)));
    }
    let handle = simulator.start()?;

    if handle.logging_active() {
        info!(path = %log_path.display(), "Logging telemetry");
    } else {
        warn!("Telemetry logging disabled for this session");
    }
    println!("{HELP}");

    let lines = spawn_stdin_reader()?;
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };
    let reason = run_until_stop(lines, &handle, units, args.duration, interrupt).await;
    info!(?reason, "Stopping");

    let summary = handle.shutdown().await?;
    println!(
        "ticks: {} | rows written: {} | skipped: {} | dropped: {}",
        summary.ticks, summary.log.written, summary.log.skipped, summary.log_dropped
    );
    Ok(())
}

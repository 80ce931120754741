//! Marga - plan a route through the arena and fly it
//!
//! Runs up to three threads next to the main thread:
//!
//! - **Flight Thread**: owns the vehicle link and executes the plan
//! - **Feedback Thread**: polls live speed and height (spawned by the executor)
//! - **Console Thread**: `c` + Enter cancels the flight
//!
//! SIGINT and SIGTERM also cancel. Whatever stops the flight, the vehicle
//! lands before the process exits.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info, warn};
use tracing_subscriber::filter::Directive;

use marga::error::{MargaError, Result};
use marga::flight::{FlightExecutor, LandingStatus};
use marga::planning::{NullObserver, PlanError, RrtPlanner};
use marga::shared::{CancellationToken, TelemetryChannel, TelemetryReceiver};
use marga::sim::SimulatedDrone;
use marga::MargaConfig;
use marga::threads::{spawn_console_listener, spawn_flight};

/// Plan a collision-free route and fly it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to marga.toml if present)
    config: Option<PathBuf>,

    /// Planner seed, overrides the config (0 = random)
    #[arg(long)]
    seed: Option<u64>,

    /// Start the flight without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Do not listen for `c` on stdin
    #[arg(long)]
    no_console: bool,
}

fn main() -> Result<ExitCode> {
    // Initialize logging
    let directive: Directive = "marga=info"
        .parse()
        .map_err(|e| MargaError::Config(format!("Invalid log directive: {}", e)))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.planner.seed = seed;
    }

    info!("Marga v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Arena {:.0}x{:.0}cm, {} obstacles, start ({:.0}, {:.0}), goal ({:.0}, {:.0})",
        config.arena.width,
        config.arena.height,
        config.arena.obstacles.len(),
        config.arena.start.x,
        config.arena.start.y,
        config.arena.goal.x,
        config.arena.goal.y
    );

    let planner = RrtPlanner::new(config.planner_config());
    let path = match planner.plan(&config.planning_problem(), &mut NullObserver) {
        Ok(path) => path,
        Err(e @ PlanError::Exhausted { .. }) => {
            error!("No path found: {}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        "Path found: {} waypoints, {:.1}cm, {} iterations, tree size {}",
        path.waypoints.len(),
        path.length(),
        path.iterations,
        path.tree_size
    );
    for (i, p) in path.waypoints.iter().enumerate() {
        info!("  [{}] ({:.1}, {:.1})", i, p.x, p.y);
    }

    if !args.yes && !confirm("Start flight? (y/n) ")? {
        info!("Flight declined");
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancellationToken::new();
    setup_signal_handler(cancel.clone())?;
    if !args.no_console {
        spawn_console_listener(cancel.clone())?;
        info!("Type 'c' + Enter to cancel the flight");
    }

    let channel = TelemetryChannel::new(config.flight.telemetry_capacity);
    let consumer = spawn_telemetry_consumer(channel.subscribe())?;

    let drone = SimulatedDrone::new(config.sim_config());
    let executor = FlightExecutor::new(
        Box::new(drone),
        config.flight_config(),
        cancel.clone(),
        channel,
    );
    let feedback = executor.feedback();
    let history = executor.history();
    let flight = spawn_flight(executor, path.waypoints)?;

    // Main thread: report live progress until the flight thread exits
    let check_interval = Duration::from_millis(500);
    while !flight.is_finished() {
        std::thread::sleep(check_interval);
        if let Some(snapshot) = *feedback.read() {
            info!(
                "Live: speed {:.1}cm/s, height {:.0}cm, {} samples",
                snapshot.speed,
                snapshot.height,
                history.read().len()
            );
        }
    }

    let report = flight.join()?;
    if consumer.join().is_err() {
        warn!("Telemetry consumer panicked");
    }

    info!("Outcome: {}", report.outcome.reason());
    match &report.landing {
        LandingStatus::NotAirborne => info!("Vehicle never left the ground"),
        LandingStatus::Landed => info!("Vehicle landed"),
        LandingStatus::Failed(e) => error!("Landing failed: {}", e),
    }
    info!("Recorded {} telemetry samples", report.history.len());
    if report.dropped_samples > 0 {
        warn!(
            "{} telemetry samples dropped by slow consumers",
            report.dropped_samples
        );
    }

    Ok(if report.outcome.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_config(path: Option<&Path>) -> Result<MargaConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            MargaConfig::load(path)?
        }
        None if Path::new("marga.toml").exists() => {
            info!("Loading configuration from marga.toml");
            MargaConfig::load(Path::new("marga.toml"))?
        }
        None => {
            info!("Using default configuration");
            MargaConfig::default()
        }
    };
    Ok(config)
}

/// Ask a yes/no question on stdin. EOF counts as no.
fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Cancel the flight on SIGINT or SIGTERM.
fn setup_signal_handler(cancel: CancellationToken) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                if cancel.cancel() {
                    warn!("Received signal {}, cancelling flight...", sig);
                }
            }
        })?;
    Ok(())
}

/// Log every telemetry sample until the flight drops the channel.
fn spawn_telemetry_consumer(
    receiver: TelemetryReceiver,
) -> Result<std::thread::JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("telemetry".to_string())
        .spawn(move || {
            for sample in receiver.iter() {
                tracing::debug!(
                    "Telemetry t={:.1}s wp {} ({:.1}, {:.1}) z={:.0} yaw={:.0}",
                    sample.time_s,
                    sample.waypoint_index,
                    sample.x,
                    sample.y,
                    sample.z,
                    sample.yaw
                );
            }
        })?;
    Ok(handle)
}

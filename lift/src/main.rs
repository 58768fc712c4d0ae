//! # Lift Frame Controller
//!
//! Process entry point: loads the deployment config, opens the device port
//! through the driver registry and runs the movement controller.
//!
//! # Usage
//!
//! ```bash
//! # Serve relay commands ({"requestedMotion": n}) from stdin
//! lift --config config/lift.toml serve
//!
//! # Same against the in-process simulated frame
//! lift --config config/lift.toml -s serve
//!
//! # One-shot moves
//! lift --config config/lift.toml move high
//! lift --config config/lift.toml goto 350
//!
//! # Clear both direction flags / read flags and positions
//! lift --config config/lift.toml stop
//! lift --config config/lift.toml status
//! ```

#![deny(warnings)]

mod intake;
mod report;

use clap::{Parser, Subcommand};
use lift_common::config::{ConfigLoader, LogLevel, Validate};
use lift_common::consts::DEFAULT_CONFIG_PATH;
use lift_common::control::command::Preset;
use lift_common::control::state::ControllerState;
use lift_common::frame::config::LiftConfig;
use lift_common::port::{DevicePort, read_direction_flags, read_frame};
use lift_control::safety::stop::stop_all;
use lift_control::{ControllerHandle, spawn_controller};
use lift_hal::{DriverError, default_registry};
use std::error::Error;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use report::{DeviceView, StatusView};

type BoxError = Box<dyn Error>;
type ControllerTask = JoinHandle<Box<dyn DevicePort>>;

/// Status poll period while waiting for a session to end.
const SETTLE_POLL: Duration = Duration::from_millis(20);

/// How long an aborted session may take to stop before the process
/// issues the stop writes itself.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Lift frame controller
#[derive(Parser, Debug)]
#[command(name = "lift")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Movement controller for a multi-actuator lift frame")]
#[command(long_about = None)]
struct Args {
    /// Path to the deployment configuration (lift.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation driver
    #[arg(short = 's', long)]
    simulate: bool,

    /// Override the configured device driver
    #[arg(short, long, conflicts_with = "simulate")]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Serve relay commands from stdin until EOF or Ctrl+C (default)
    Serve,
    /// Move to a preset (low | high) and exit
    Move {
        /// Preset name
        preset: Preset,
    },
    /// Move the primary actuator to a position and exit
    Goto {
        /// Target position
        #[arg(allow_negative_numbers = true)]
        position: i16,
    },
    /// Clear both direction flags
    Stop,
    /// Print direction flags and actuator positions
    Status,
}

fn main() -> Result<(), BoxError> {
    if let Err(e) = run() {
        error!("Lift controller failed: {}", e);
        eprintln!("lift: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), BoxError> {
    let args = Args::parse();

    let mut config = LiftConfig::load(&args.config)?;
    setup_tracing(&args, config.shared.log_level);
    info!(
        "Lift controller v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    if args.simulate {
        info!("Simulation mode enabled");
        config.device.driver = "simulation".to_string();
    } else if let Some(driver) = &args.driver {
        info!("Driver from CLI: {}", driver);
        config.device.driver = driver.clone();
    }
    config.validate()?;
    info!(
        "Config loaded from {}: driver '{}', limits [{}, {}] tol {}",
        args.config.display(),
        config.device.driver,
        config.limits.min_position,
        config.limits.max_position,
        config.limits.tolerance
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(args.command.unwrap_or(Command::Serve), config))?;

    info!("Lift controller shutdown complete");
    Ok(())
}

async fn dispatch(command: Command, config: LiftConfig) -> Result<(), BoxError> {
    match command {
        Command::Serve => serve(&config).await,
        Command::Move { preset } => {
            move_once(&config, |handle| handle.request_move(preset)).await
        }
        Command::Goto { position } => {
            move_once(&config, |handle| handle.request_move_to(position)).await
        }
        Command::Stop => stop(&config).await,
        Command::Status => status(&config).await,
    }
}

// ─── Subcommands ────────────────────────────────────────────────────

async fn serve(config: &LiftConfig) -> Result<(), BoxError> {
    let stdin = BufReader::new(tokio::io::stdin());
    serve_from(config, open_port(config)?, stdin, tokio::io::stdout()).await
}

async fn serve_from<R, W>(
    config: &LiftConfig,
    port: Box<dyn DevicePort>,
    reader: R,
    writer: W,
) -> Result<(), BoxError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (handle, mut task) = spawn_controller(port, config);
    let intake = intake::run(&handle, reader, writer);

    let served = match supervise(config, &mut task, intake).await? {
        Some(Ok(())) => {
            info!("Command input closed");
            Ok(())
        }
        Some(Err(e)) => {
            error!("Command input failed: {}", e);
            Err(e)
        }
        None => {
            info!("Received shutdown signal (Ctrl+C)");
            Ok(())
        }
    };
    // The session is stopped before any intake error is reported.
    shutdown(config, handle, task).await?;
    served.map_err(BoxError::from)
}

async fn move_once<F, E>(config: &LiftConfig, submit: F) -> Result<(), BoxError>
where
    F: FnOnce(&ControllerHandle) -> Result<(), E>,
    E: Error + 'static,
{
    let (handle, mut task) = spawn_controller(open_port(config)?, config);
    if let Err(e) = submit(&handle) {
        shutdown(config, handle, task).await?;
        return Err(e.into());
    }

    let settled = supervise(config, &mut task, handle.wait_until_settled(SETTLE_POLL)).await?;
    let Some(status) = settled else {
        info!("Received shutdown signal (Ctrl+C)");
        shutdown(config, handle, task).await?;
        return Err("movement interrupted by shutdown signal".into());
    };
    println!("{}", serde_json::to_string(&StatusView::from(&status))?);
    shutdown(config, handle, task).await?;

    match status.last_outcome {
        Some(outcome) if outcome.reached_target() => Ok(()),
        Some(outcome) => Err(outcome.to_string().into()),
        None => Err("controller settled without an outcome".into()),
    }
}

async fn stop(config: &LiftConfig) -> Result<(), BoxError> {
    let mut port = open_port(config)?;
    let result = stop_all(&mut port, &config.direction_flags()).await;
    port.shutdown().await?;
    result?;
    info!("Both direction flags cleared");
    Ok(())
}

async fn status(config: &LiftConfig) -> Result<(), BoxError> {
    let mut port = open_port(config)?;
    let flags = read_direction_flags(&mut port, &config.direction_flags()).await?;
    let frame = read_frame(&mut port, &config.layout()).await?;
    port.shutdown().await?;
    println!("{}", serde_json::to_string(&DeviceView::new(flags, &frame))?);
    Ok(())
}

// ─── Process glue ───────────────────────────────────────────────────

fn open_port(config: &LiftConfig) -> Result<Box<dyn DevicePort>, DriverError> {
    default_registry().create_port(&config.device.driver, config)
}

/// Run `work` until it completes or Ctrl+C arrives (`Ok(None)`).
///
/// A controller task that ends while handles are still alive has panicked:
/// the stop writes are issued over a fresh port and the error is returned.
async fn supervise<F>(
    config: &LiftConfig,
    task: &mut ControllerTask,
    work: F,
) -> Result<Option<F::Output>, BoxError>
where
    F: Future,
{
    tokio::select! {
        output = work => Ok(Some(output)),
        received = signal::ctrl_c() => {
            if let Err(e) = received {
                error!("Unable to listen for shutdown signal: {}", e);
            }
            Ok(None)
        }
        joined = task => {
            fatal_stop(config).await;
            match joined {
                Err(e) => Err(format!("controller task failed: {e}").into()),
                Ok(_) => Err("controller task exited unexpectedly".into()),
            }
        }
    }
}

/// Abort any active session, wait for the stop, then release the port.
async fn shutdown(
    config: &LiftConfig,
    handle: ControllerHandle,
    task: ControllerTask,
) -> Result<(), BoxError> {
    if handle.request_abort().signalled() {
        info!("Aborting active movement");
    }
    let settled = timeout(SHUTDOWN_GRACE, handle.wait_until_settled(SETTLE_POLL)).await;
    drop(handle);

    match settled {
        Err(_) => {
            error!("Controller did not stop within {:?}", SHUTDOWN_GRACE);
            task.abort();
            let _ = task.await;
            fatal_stop(config).await;
            return Err("controller did not stop in time".into());
        }
        Ok(status) if status.state == ControllerState::Faulted => {
            warn!("Controller is faulted at shutdown; actuator state unknown");
        }
        Ok(_) => {}
    }

    match task.await {
        Ok(mut port) => {
            port.shutdown().await?;
            Ok(())
        }
        Err(e) => {
            fatal_stop(config).await;
            Err(format!("controller task failed: {e}").into())
        }
    }
}

/// Best-effort stop over a port that does not share state with the
/// controller's.
async fn fatal_stop(config: &LiftConfig) {
    error!("Issuing emergency stop over a fresh port");
    match open_port(config) {
        Ok(mut port) => match stop_all(&mut port, &config.direction_flags()).await {
            Ok(()) => warn!("Emergency stop confirmed"),
            Err(e) => error!("Emergency stop failed: {}", e),
        },
        Err(e) => error!("Cannot open port for emergency stop: {}", e),
    }
}

/// Setup tracing subscriber based on CLI arguments and config.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match configured {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

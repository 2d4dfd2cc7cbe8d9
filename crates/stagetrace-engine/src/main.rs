//! Host harness binary for the stagetrace debugger.
//!
//! Runs a demo block simulation on a dedicated simulation thread, bracketing
//! every unit of work with tick stages, and reads controller commands from
//! stdin on a reader thread feeding the tokio command loop. Status lines go
//! to stdout as JSON; logs go to stderr. The process exits once the
//! simulation stops, even while stdin stays open.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `stagetrace-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the breakpoint manager from the configured breakpoints
//! 4. Spawn the simulation thread
//! 5. Read controller commands until `quit`, end of input, or the
//!    simulation stops
//! 6. Shut down and join the simulation thread

mod commands;
mod controller;
mod error;
mod input;
mod simulation;
mod status;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};

use stagetrace_breakpoints::{BreakpointManager, BreakpointRegistry};
use stagetrace_core::{DebugContext, DebuggerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, CommandError};
use crate::controller::Controller;
use crate::error::EngineError;
use crate::simulation::Breakpoints;
use crate::status::Status;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG: &str = "stagetrace-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the simulation thread
/// cannot be started, or the simulation fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!(
        source = source.as_ref().map_or("defaults", |_| "file"),
        path = ?source,
        debugger_enabled = config.debugger.enabled,
        work_errors = ?config.debugger.work_errors,
        max_ticks = config.simulation.max_ticks,
        "stagetrace-engine starting"
    );

    // 3. Build the breakpoint manager.
    let mut manager = BreakpointManager::new(BreakpointRegistry::with_builtin_kinds());
    let loaded = manager.load_specs(&config.breakpoints);
    if loaded < config.breakpoints.len() {
        warn!(
            configured = config.breakpoints.len(),
            loaded, "Some configured breakpoints were skipped"
        );
    }
    let manager = Arc::new(Mutex::new(manager));

    // 4. Spawn the simulation thread.
    let ctx = Arc::new(DebugContext::new());
    let (step_tx, step_rx) = mpsc::channel::<Command>();
    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel::<()>();

    let sim_ctx = Arc::clone(&ctx);
    let hook = Breakpoints::new(Arc::clone(&manager), config.debugger.enabled);
    let settings = config.debugger.clone();
    let sim_config = config.simulation.clone();
    let sim_thread = std::thread::Builder::new()
        .name("simulation".to_owned())
        .spawn(move || {
            let result = simulation::run(&sim_ctx, &hook, &settings, &sim_config, step_rx);
            if let Err(e) = &result {
                tracing::error!(error = %e, "Simulation thread failed");
                sim_ctx.shutdown();
            }
            // The receiver is gone if the input loop already returned.
            let _ = done_tx.send(());
            result
        })
        .map_err(EngineError::from)?;

    // 5. Read controller commands.
    let controller = Controller::new(
        Arc::clone(&ctx),
        Arc::clone(&manager),
        step_tx,
        config.debugger.enabled,
    );
    let mut lines = input::spawn_reader(std::io::BufReader::new(std::io::stdin()))?;
    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line.transpose()? else {
                    info!("Controller input closed");
                    break;
                };
                match commands::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Some(status) = controller.handle(command) {
                            status.emit();
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => Status::error(e).emit(),
                }
            }
            _ = &mut done_rx => break,
        }
    }

    // 6. Shut down and join.
    ctx.shutdown();
    drop(controller);
    let joined = tokio::task::spawn_blocking(move || sim_thread.join())
        .await
        .map_err(|e| EngineError::Simulation {
            message: e.to_string(),
        })?;
    let ticks = match joined {
        Ok(result) => result?,
        Err(_) => {
            return Err(EngineError::Simulation {
                message: "simulation thread panicked".to_owned(),
            }
            .into());
        }
    };

    Status::Stopped { ticks }.emit();
    info!(ticks, "stagetrace-engine shutdown complete");
    Ok(())
}

/// Load the debugger configuration.
///
/// Uses the first command-line argument as the path, falling back to
/// [`DEFAULT_CONFIG`] in the working directory. A missing default file means
/// defaults; a missing explicit file is an error. Returns the path the
/// configuration came from, if any.
fn load_config() -> Result<(DebuggerConfig, Option<PathBuf>), EngineError> {
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        let config = DebuggerConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }
    let path = PathBuf::from(DEFAULT_CONFIG);
    if path.exists() {
        let config = DebuggerConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((DebuggerConfig::default(), None))
    }
}

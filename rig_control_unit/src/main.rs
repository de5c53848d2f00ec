//! # Rig Control Unit
//!
//! Outer process loop for the tilt/rotate rig. Loads the TOML config, opens
//! the I/O driver, applies calibration, homes both axes and then either runs
//! one session (`--tilt/--rotate/--dir`) or stays up watching ESTOP until
//! interrupted.

use clap::Parser;
use rig_common::config::ChannelMap;
use rig_common::control::{MachineStatus, RotateDirection, SessionConfig};
use rig_common::time::{Clock, MonotonicClock};
use rig_control_unit::calibration::{CalibrationStore, JsonCalibrationStore, MemoryCalibrationStore};
use rig_control_unit::{RigConfig, RigIo, SessionOrchestrator};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Rig Control Unit: tilt/rotate session controller
#[derive(Parser, Debug)]
#[command(name = "rig_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Homing and tilt/rotate session control for the rig")]
struct Args {
    /// Path to the rig TOML configuration. Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Force the simulation driver with in-memory calibration.
    #[arg(long)]
    simulate: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// One-shot session: tilt target [deg].
    #[arg(long, requires = "rotate")]
    tilt: Option<i32>,

    /// One-shot session: rotation amount [deg].
    #[arg(long, requires = "tilt")]
    rotate: Option<i32>,

    /// One-shot session: rotation direction (cw|ccw).
    #[arg(long, default_value = "cw")]
    dir: RotateDirection,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Rig Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Rig Control Unit shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            RigConfig::load_validated(path)?
        }
        None => {
            warn!("No --config given, using built-in defaults");
            RigConfig::default()
        }
    };
    if args.simulate {
        config.driver = "simulation".to_string();
    }
    info!(
        "Config OK: service={}, driver={}, tick={}ms",
        config.shared.service_name, config.driver, config.control.tick_interval_ms
    );

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let mut orch = build_orchestrator(&config, args.simulate, Arc::clone(&clock))?;
    orch.init();
    orch.calibrate_tilt()?;
    orch.calibrate_rotate()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    orch.begin_home()?;
    let status = drive(&mut orch, clock.as_ref(), &running);
    if status != MachineStatus::Ready {
        orch.stop_session();
        return Err(format!("homing ended in {status}").into());
    }
    info!("Both axes homed");

    if let (Some(tilt), Some(rotate)) = (args.tilt, args.rotate) {
        let cfg = SessionConfig::new(tilt, args.dir, rotate);
        orch.start_session(cfg)?;
        let status = drive(&mut orch, clock.as_ref(), &running);
        if status != MachineStatus::Done {
            orch.stop_session();
            return Err(format!("session ended in {status}").into());
        }
        info!(position = orch.rotate().read_position(), "Session complete");
        return Ok(());
    }

    info!("Idle, watching ESTOP (Ctrl-C to exit)");
    while running.load(Ordering::SeqCst) {
        step(&mut orch);
        clock.sleep(orch.tick_interval_ms());
    }
    orch.stop_session();
    Ok(())
}

fn build_orchestrator(
    config: &RigConfig,
    simulate: bool,
    clock: Arc<dyn Clock>,
) -> Result<SessionOrchestrator, Box<dyn std::error::Error>> {
    let channels: ChannelMap = config.channels.clone();
    let driver = rig_hal::create_driver(
        &config.driver,
        &config.simulation,
        channels.clone(),
        Arc::clone(&clock),
    )?;

    let store: Box<dyn CalibrationStore> = if simulate {
        Box::new(MemoryCalibrationStore::calibrated())
    } else {
        Box::new(JsonCalibrationStore::new(&config.control.calibration_path))
    };

    let io = RigIo::new(driver, channels, clock, config.control.sample_spacing_ms);
    info!("I/O driver '{}' ready", io.driver_name());
    Ok(SessionOrchestrator::new(
        io,
        store,
        config.control.tick_interval_ms,
    ))
}

/// Tick until the orchestrator leaves `Running` or shutdown is requested.
fn drive(orch: &mut SessionOrchestrator, clock: &dyn Clock, running: &AtomicBool) -> MachineStatus {
    while orch.status() == MachineStatus::Running {
        if !running.load(Ordering::SeqCst) {
            warn!("Shutdown requested mid-motion, stopping");
            orch.stop_session();
            break;
        }
        clock.sleep(orch.tick_interval_ms());
        step(orch);
    }
    orch.status()
}

fn step(orch: &mut SessionOrchestrator) {
    if let Err(e) = orch.poll_estop_input() {
        warn!("ESTOP input unreadable, latched: {e}");
    }
    let before = orch.status();
    let after = orch.tick();
    if before != after {
        info!("Status {before} -> {after} (phase {:?})", orch.phase());
    }
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

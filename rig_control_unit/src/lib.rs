//! # Rig Control Unit
//!
//! Motion-control engine for the tilt/rotate rig: two non-blocking axis
//! controllers, the shared machine state they coordinate through, and the
//! session orchestrator that sequences homing, tilt and rotate phases under
//! pause/resume/stop and an ESTOP override.
//!
//! ## Layers
//!
//! 1. **RigIo** - semantic sensor reads and relay pairs over an `IoDriver`
//! 2. **TiltController / RotateController** - per-axis begin/service state machines
//! 3. **SessionOrchestrator** - machine status and phase, driven by `tick()`
//!
//! Nothing here blocks except [`SessionOrchestrator::home`], which sleeps on
//! the injected clock between ticks.

pub mod axis;
pub mod calibration;
pub mod config;
pub mod io;
pub mod orchestrator;
pub mod state;

pub use axis::{AxisFault, RotateController, TiltController};
pub use calibration::{CalibrationError, CalibrationStore, JsonCalibrationStore, MemoryCalibrationStore};
pub use config::RigConfig;
pub use io::RigIo;
pub use orchestrator::{ControlError, SessionOrchestrator};
pub use state::SharedState;

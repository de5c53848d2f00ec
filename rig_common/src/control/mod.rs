//! Control-level value types shared between the controllers, the
//! orchestrator and anything that reports on them.

pub mod calibration;
pub mod session;
pub mod state;

pub use calibration::{RotateCalibration, TiltCalibration};
pub use session::SessionConfig;
pub use state::{Axis, AxisResult, AxisState, ControlPhase, MachineStatus, RotateDirection};

//! Axis controllers.
//!
//! Each controller is a non-blocking state machine: a `begin_*` call starts
//! a motion and returns immediately, `service*` is polled every tick until
//! it returns a terminal [`AxisResult`](rig_common::control::AxisResult).
//! On every abnormal exit the axis relay is dropped before returning.

pub mod rotate;
pub mod tilt;

pub use rotate::{RotateController, RotateMode, RotateOnePhase};
pub use tilt::TiltController;

use rig_common::control::Axis;
use rig_common::io::IoError;
use thiserror::Error;

/// Why a controller last returned `AxisResult::Error`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AxisFault {
    #[error("{0} axis is not homed")]
    NotHomed(Axis),

    #[error("{0} axis has no calibration applied")]
    NotCalibrated(Axis),

    #[error("target {value:.3} outside {min:.3}..={max:.3}")]
    OutOfRange { value: f32, min: f32, max: f32 },

    #[error("I/O failure: {0}")]
    Io(#[from] IoError),

    /// ADC did not move by the progress threshold within the stall window.
    #[error("no movement for {idle_ms} ms (adc stuck at {adc})")]
    Stall { adc: i32, idle_ms: u64 },

    #[error("motion exceeded its {timeout_ms} ms budget")]
    Timeout { timeout_ms: u64 },

    /// Rotate-one was requested away from the home sensor.
    #[error("rotate axis must start at home")]
    NotAtHome,

    /// Rotate-one ran out of time before the home sensor tripped again.
    #[error("home sensor not seen within {timeout_ms} ms of rotation")]
    NoHomeDuringRotate { timeout_ms: u64 },
}

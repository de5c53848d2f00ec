//! Prelude module for common re-exports.
//!
//! ```rust
//! use rig_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ChannelMap, ConfigError, ConfigLoader, ControlConfig, LogLevel, SharedConfig};

// ─── Control Types ──────────────────────────────────────────────────
pub use crate::control::{
    Axis, AxisResult, AxisState, ControlPhase, MachineStatus, RotateCalibration,
    RotateDirection, SessionConfig, TiltCalibration,
};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::io::{IoDriver, IoError, PointKind};

// ─── Time ───────────────────────────────────────────────────────────
pub use crate::time::{Clock, ManualClock, MonotonicClock, TickGate};

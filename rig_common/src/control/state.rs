//! Status and state enums shared by the controllers and the orchestrator.
//!
//! `AxisState` uses `#[repr(u8)]` so it can be published through an
//! `AtomicU8` in the shared machine state.

use serde::{Deserialize, Serialize};

// ─── Machine Level ──────────────────────────────────────────────────

/// Top-level status reported to the caller loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MachineStatus {
    /// Idle, homed or not, accepting commands.
    Ready = 0,
    /// Homing or a session is in progress.
    Running = 1,
    /// Session paused, resumable.
    Paused = 2,
    /// Last session completed.
    Done = 3,
    /// Emergency stop latched. Only `init` clears it.
    EStop = 4,
    /// Failure or deliberate stop.
    Fault = 5,
}

impl MachineStatus {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ready),
            1 => Some(Self::Running),
            2 => Some(Self::Paused),
            3 => Some(Self::Done),
            4 => Some(Self::EStop),
            5 => Some(Self::Fault),
            _ => None,
        }
    }

    /// States from which homing or a new session may begin.
    #[inline]
    pub const fn accepts_commands(self) -> bool {
        matches!(self, Self::Ready | Self::Done)
    }
}

impl Default for MachineStatus {
    fn default() -> Self {
        Self::Ready
    }
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Done => "DONE",
            Self::EStop => "ESTOP",
            Self::Fault => "FAULT",
        };
        f.write_str(s)
    }
}

/// Which controller the orchestrator services on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlPhase {
    Idle = 0,
    HomeTilt = 1,
    HomeRotate = 2,
    Tilt = 3,
    Rotate = 4,
    Done = 5,
}

impl ControlPhase {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::HomeTilt),
            2 => Some(Self::HomeRotate),
            3 => Some(Self::Tilt),
            4 => Some(Self::Rotate),
            5 => Some(Self::Done),
            _ => None,
        }
    }
}

impl Default for ControlPhase {
    fn default() -> Self {
        Self::Idle
    }
}

// ─── Axis Level ─────────────────────────────────────────────────────

/// Coarse per-axis state, published for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AxisState {
    Idle = 0,
    RunningTilt = 1,
    RunningRotate = 2,
    RunningTiltCalibrate = 3,
    RunningRotateCalibrate = 4,
}

impl AxisState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::RunningTilt),
            2 => Some(Self::RunningRotate),
            3 => Some(Self::RunningTiltCalibrate),
            4 => Some(Self::RunningRotateCalibrate),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_running(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl Default for AxisState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Outcome of every controller Begin/Service call.
///
/// `Running` means "call Service again next tick". `Ok`, `Stopped` and
/// `Error` are terminal. `Paused` ends this call but the motion can be
/// re-issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisResult {
    Ok,
    Running,
    Paused,
    Stopped,
    Error,
}

impl AxisResult {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ok | Self::Stopped | Self::Error)
    }
}

/// Rotation direction as seen from above the turntable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotateDirection {
    #[default]
    Cw,
    Ccw,
}

impl RotateDirection {
    /// Level written to the direction relay.
    #[inline]
    pub const fn is_cw(self) -> bool {
        matches!(self, Self::Cw)
    }

    /// Sign applied to dead-reckoned degrees.
    #[inline]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Cw => 1.0,
            Self::Ccw => -1.0,
        }
    }
}

impl std::fmt::Display for RotateDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cw => "cw",
            Self::Ccw => "ccw",
        })
    }
}

impl std::str::FromStr for RotateDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cw" => Ok(Self::Cw),
            "ccw" => Ok(Self::Ccw),
            other => Err(format!("unknown direction '{other}' (expected cw|ccw)")),
        }
    }
}

/// Axis identifier for logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Tilt,
    Rotate,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tilt => "tilt",
            Self::Rotate => "rotate",
        })
    }
}

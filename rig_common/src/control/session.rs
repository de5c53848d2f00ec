//! Session request value object.

use serde::{Deserialize, Serialize};

use super::state::RotateDirection;
use crate::config::ConfigError;

/// Upper bound accepted for a session's tilt target [deg].
pub const SESSION_MAX_TILT_DEGREE: i32 = 90;

/// One tilt-then-rotate job.
///
/// Copied into the orchestrator when the session starts and dropped when it
/// reaches `Done` or `Fault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Tilt target, `0..=90` degrees.
    pub tilt_degree: i32,
    pub rotate_dir: RotateDirection,
    /// Rotation amount in degrees, `>= 0`. Zero skips the rotate phase.
    pub rotate_num: i32,
}

impl SessionConfig {
    pub const fn new(tilt_degree: i32, rotate_dir: RotateDirection, rotate_num: i32) -> Self {
        Self {
            tilt_degree,
            rotate_dir,
            rotate_num,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=SESSION_MAX_TILT_DEGREE).contains(&self.tilt_degree) {
            return Err(ConfigError::ValidationError(format!(
                "tilt_degree {} outside 0..={SESSION_MAX_TILT_DEGREE}",
                self.tilt_degree
            )));
        }
        if self.rotate_num < 0 {
            return Err(ConfigError::ValidationError(format!(
                "rotate_num {} must be >= 0",
                self.rotate_num
            )));
        }
        Ok(())
    }
}

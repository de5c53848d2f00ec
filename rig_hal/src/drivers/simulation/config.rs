//! Simulation parameters.
//!
//! Lives in the `[simulation]` table of the daemon config; every field has
//! a default so the table may be omitted.

use serde::{Deserialize, Serialize};

/// Physical behaviour of the simulated rig.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Tilt potentiometer slew while the actuator is energized [V/s].
    pub tilt_volts_per_sec: f32,
    /// Extra travel after the actuator is de-energized [V].
    pub tilt_coast_volts: f32,
    /// Tilt home sensor is active at or below this voltage.
    pub tilt_home_volts: f32,
    /// Retracted mechanical end stop [V].
    pub tilt_min_volts: f32,
    /// Extended mechanical end stop [V].
    pub tilt_max_volts: f32,
    pub initial_tilt_volts: f32,
    /// Turntable speed while the motor is energized.
    pub rpm: f32,
    /// Rotate home sensor is active within this many degrees of 0°.
    pub home_window_deg: f32,
    pub initial_rotate_deg: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tilt_volts_per_sec: 0.3,
            tilt_coast_volts: 0.2,
            tilt_home_volts: 0.35,
            tilt_min_volts: 0.1,
            tilt_max_volts: 9.0,
            initial_tilt_volts: 2.0,
            rpm: 1.0,
            home_window_deg: 2.0,
            initial_rotate_deg: 90.0,
        }
    }
}

impl SimulationConfig {
    /// Rig that starts with both axes on their home sensors.
    pub fn homed() -> Self {
        Self {
            initial_tilt_volts: 0.3,
            initial_rotate_deg: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tilt_volts_per_sec <= 0.0 {
            return Err("simulation.tilt_volts_per_sec must be > 0".into());
        }
        if self.tilt_max_volts <= self.tilt_min_volts {
            return Err("simulation.tilt_max_volts must exceed tilt_min_volts".into());
        }
        if self.rpm <= 0.0 {
            return Err("simulation.rpm must be > 0".into());
        }
        if !(0.0..180.0).contains(&self.home_window_deg) {
            return Err("simulation.home_window_deg must be within 0..180".into());
        }
        Ok(())
    }
}

//! Per-axis calibration value objects.
//!
//! Produced by a calibration store, validated once, then applied to the
//! controllers and treated as immutable.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Tilt actuator calibration.
///
/// Voltages are potentiometer readings at the mechanical limits; angles
/// are the matching tilt in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiltCalibration {
    /// Settle time after the actuator seats at home [ms].
    pub seat_time_ms: u64,
    pub minimum_volts: f32,
    pub maximum_volts: f32,
    pub deadband: f32,
    /// Compensation added to inward targets [V].
    pub stop_band_in: f32,
    /// Compensation subtracted from outward targets [V].
    pub stop_band_out: f32,
    /// Actuator speed, used only for timeout estimates.
    pub sec_per_degree: f32,
    pub max_angle: f32,
    pub min_angle: f32,
    /// Service-function rate limit [ms].
    pub control_time_ms: u64,
}

impl Default for TiltCalibration {
    fn default() -> Self {
        Self {
            seat_time_ms: 200,
            minimum_volts: 0.29,
            maximum_volts: 8.55,
            deadband: 0.0,
            stop_band_in: 0.2,
            stop_band_out: 0.2,
            sec_per_degree: 0.5,
            max_angle: 75.0,
            min_angle: 0.0,
            control_time_ms: 100,
        }
    }
}

impl TiltCalibration {
    /// Symmetric stop-band, as used by older actuator revisions.
    pub fn with_stop_band(mut self, band: f32) -> Self {
        self.stop_band_in = band;
        self.stop_band_out = band;
        self
    }

    /// Linear degree → volt mapping. Returns `minimum_volts` when the angle
    /// span is empty.
    pub fn tilt_to_volt(&self, degree: f32) -> f32 {
        let span = self.max_angle - self.min_angle;
        if span <= 0.0 {
            return self.minimum_volts;
        }
        self.minimum_volts
            + (degree - self.min_angle) * (self.maximum_volts - self.minimum_volts) / span
    }

    /// Inverse of [`tilt_to_volt`](Self::tilt_to_volt). Returns `min_angle`
    /// when the voltage span is empty.
    pub fn volt_to_tilt(&self, volt: f32) -> f32 {
        let span = self.maximum_volts - self.minimum_volts;
        if span <= 0.0 {
            return self.min_angle;
        }
        self.min_angle + (volt - self.minimum_volts) * (self.max_angle - self.min_angle) / span
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::ValidationError(format!("tilt: {msg}")));

        let finite = [
            self.minimum_volts,
            self.maximum_volts,
            self.deadband,
            self.stop_band_in,
            self.stop_band_out,
            self.sec_per_degree,
            self.max_angle,
            self.min_angle,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return fail("values must be finite");
        }
        if self.maximum_volts <= self.minimum_volts {
            return fail("maximum_volts must be greater than minimum_volts");
        }
        if self.max_angle < self.min_angle {
            return fail("max_angle must be >= min_angle");
        }
        if self.minimum_volts < 0.0 || self.maximum_volts > 10.0 {
            return fail("voltage limits must lie within 0-10 V");
        }
        if self.stop_band_in < 0.0 || self.stop_band_out < 0.0 || self.deadband < 0.0 {
            return fail("stop_band_in, stop_band_out and deadband must be >= 0");
        }
        if self.sec_per_degree < 0.0 {
            return fail("sec_per_degree must be >= 0");
        }
        if self.control_time_ms == 0 {
            return fail("control_time_ms must be > 0");
        }
        Ok(())
    }
}

/// Rotation motor calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateCalibration {
    pub rpm: f32,
    /// Service-function rate limit [ms].
    pub control_time_ms: u64,
    /// Slack added to every duration-based timeout [ms].
    pub timeout_margin_ms: u64,
}

impl Default for RotateCalibration {
    fn default() -> Self {
        Self {
            rpm: 1.0,
            control_time_ms: 100,
            timeout_margin_ms: 5000,
        }
    }
}

impl RotateCalibration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpm.is_finite() || self.rpm <= 0.0 {
            return Err(ConfigError::ValidationError(
                "rotate: rpm must be > 0".to_string(),
            ));
        }
        if self.control_time_ms == 0 {
            return Err(ConfigError::ValidationError(
                "rotate: control_time_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

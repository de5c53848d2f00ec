//! Actuator physics for the simulated rig.
//!
//! Both models are first-order: constant speed while energized, no
//! acceleration. The tilt actuator coasts a fixed distance when switched
//! off, which is what the controller's stop-band compensates for.

use rig_common::consts::{ADC_COUNTS_PER_VOLT, ADC_FULL_SCALE, DEG_PER_SEC_PER_RPM};

use super::config::SimulationConfig;

/// Linear tilt actuator with a potentiometer and a retract-side home sensor.
#[derive(Debug, Clone)]
pub struct TiltActuator {
    volts: f32,
    volts_per_sec: f32,
    coast_volts: f32,
    home_volts: f32,
    min_volts: f32,
    max_volts: f32,
    stuck: bool,
}

impl TiltActuator {
    pub fn new(cfg: &SimulationConfig) -> Self {
        Self {
            volts: cfg.initial_tilt_volts.clamp(cfg.tilt_min_volts, cfg.tilt_max_volts),
            volts_per_sec: cfg.tilt_volts_per_sec,
            coast_volts: cfg.tilt_coast_volts,
            home_volts: cfg.tilt_home_volts,
            min_volts: cfg.tilt_min_volts,
            max_volts: cfg.tilt_max_volts,
            stuck: false,
        }
    }

    pub fn advance(&mut self, dt_ms: u64, enabled: bool, up: bool) {
        if !enabled || self.stuck || dt_ms == 0 {
            return;
        }
        let dv = self.volts_per_sec * dt_ms as f32 / 1000.0;
        self.shift(if up { dv } else { -dv });
    }

    /// Overrun after the enable relay drops.
    pub fn coast(&mut self, up: bool) {
        if self.stuck {
            return;
        }
        self.shift(if up { self.coast_volts } else { -self.coast_volts });
    }

    fn shift(&mut self, dv: f32) {
        self.volts = (self.volts + dv).clamp(self.min_volts, self.max_volts);
    }

    pub fn volts(&self) -> f32 {
        self.volts
    }

    pub fn set_volts(&mut self, volts: f32) {
        self.volts = volts.clamp(self.min_volts, self.max_volts);
    }

    pub fn at_home(&self) -> bool {
        self.volts <= self.home_volts
    }

    pub fn adc(&self) -> u16 {
        let counts = (self.volts * ADC_COUNTS_PER_VOLT).round();
        counts.clamp(0.0, ADC_FULL_SCALE as f32) as u16
    }

    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }
}

/// Turntable motor with a single proximity sensor at 0°.
#[derive(Debug, Clone)]
pub struct RotateMotor {
    angle: f32,
    deg_per_sec: f32,
    home_window: f32,
    stuck: bool,
}

impl RotateMotor {
    pub fn new(cfg: &SimulationConfig) -> Self {
        Self {
            angle: cfg.initial_rotate_deg.rem_euclid(360.0),
            deg_per_sec: cfg.rpm * DEG_PER_SEC_PER_RPM,
            home_window: cfg.home_window_deg,
            stuck: false,
        }
    }

    pub fn advance(&mut self, dt_ms: u64, enabled: bool, cw: bool) {
        if !enabled || self.stuck || dt_ms == 0 {
            return;
        }
        let step = self.deg_per_sec * dt_ms as f32 / 1000.0;
        let delta = if cw { step } else { -step };
        self.angle = (self.angle + delta).rem_euclid(360.0);
    }

    /// Current angle, `0.0..360.0`.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn set_angle(&mut self, deg: f32) {
        self.angle = deg.rem_euclid(360.0);
    }

    pub fn at_home(&self) -> bool {
        self.angle < self.home_window || self.angle > 360.0 - self.home_window
    }

    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }
}

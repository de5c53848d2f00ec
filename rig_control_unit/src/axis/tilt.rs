//! Tilt actuator controller.
//!
//! Position feedback is a linear potentiometer read as 0–10000 ADC counts.
//! Homing retracts until the home sensor trips. Moves are open-loop relay
//! drive to a stop-band compensated target, supervised for stalls and an
//! overall time budget derived from the calibrated speed.

use std::sync::Arc;

use rig_common::consts::{
    ADC_COUNTS_PER_VOLT, TILT_FALLBACK_SEC_PER_DEGREE, TILT_MIN_HOME_TIMEOUT_MS,
    TILT_MIN_MOVE_TIMEOUT_MS, TILT_PROGRESS_ADC_THRESHOLD, TILT_STALL_TIMEOUT_MS,
    TILT_TIMEOUT_MARGIN_MS, TILT_VALID_MIN_VOLTS,
};
use rig_common::control::{Axis, AxisResult, AxisState, TiltCalibration};
use rig_common::time::TickGate;
use tracing::{debug, info, warn};

use super::AxisFault;
use crate::io::RigIo;
use crate::state::SharedState;

/// Stall and timeout bookkeeping for one motion.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Supervision {
    start_ms: u64,
    last_progress_ms: u64,
    last_adc: i32,
    timeout_ms: u64,
}

impl Supervision {
    fn new(now_ms: u64, adc: i32, timeout_ms: u64) -> Self {
        Self {
            start_ms: now_ms,
            last_progress_ms: now_ms,
            last_adc: adc,
            timeout_ms,
        }
    }

    /// Record a sample and report a stall or timeout, if any.
    fn check(&mut self, now_ms: u64, adc: i32) -> Option<AxisFault> {
        if (adc - self.last_adc).abs() >= TILT_PROGRESS_ADC_THRESHOLD {
            self.last_adc = adc;
            self.last_progress_ms = now_ms;
        }
        let idle_ms = now_ms.saturating_sub(self.last_progress_ms);
        if idle_ms > TILT_STALL_TIMEOUT_MS {
            return Some(AxisFault::Stall {
                adc: self.last_adc,
                idle_ms,
            });
        }
        if now_ms.saturating_sub(self.start_ms) > self.timeout_ms {
            return Some(AxisFault::Timeout {
                timeout_ms: self.timeout_ms,
            });
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Activity {
    Idle,
    Homing(Supervision),
    Moving {
        target_adc: i32,
        up: bool,
        sup: Supervision,
    },
}

/// Controller for the tilt axis.
pub struct TiltController {
    cal: TiltCalibration,
    calibrated: bool,
    homed: bool,
    activity: Activity,
    gate: TickGate,
    last_degree: f32,
    last_volt: Option<f32>,
    last_fault: Option<AxisFault>,
    shared: Arc<SharedState>,
}

impl TiltController {
    /// Starts with default calibration, not homed.
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self {
            cal: TiltCalibration::default(),
            calibrated: false,
            homed: false,
            activity: Activity::Idle,
            gate: TickGate::new(),
            last_degree: 0.0,
            last_volt: None,
            last_fault: None,
            shared,
        }
    }

    pub fn apply_calibration(&mut self, cal: TiltCalibration) {
        info!(
            min_volts = cal.minimum_volts,
            max_volts = cal.maximum_volts,
            stop_band_in = cal.stop_band_in,
            stop_band_out = cal.stop_band_out,
            "Tilt calibration applied"
        );
        self.cal = cal;
        self.calibrated = true;
    }

    pub fn calibration(&self) -> &TiltCalibration {
        &self.cal
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn is_homed(&self) -> bool {
        self.homed
    }

    pub fn is_active(&self) -> bool {
        self.activity != Activity::Idle
    }

    pub fn state(&self) -> AxisState {
        if self.is_active() {
            AxisState::RunningTilt
        } else {
            AxisState::Idle
        }
    }

    pub fn last_fault(&self) -> Option<&AxisFault> {
        self.last_fault.as_ref()
    }

    /// Last successfully read voltage.
    pub fn last_volt(&self) -> Option<f32> {
        self.last_volt
    }

    /// Compensated target of the current move, in ADC counts.
    pub fn target_adc(&self) -> Option<i32> {
        match self.activity {
            Activity::Moving { target_adc, .. } => Some(target_adc),
            _ => None,
        }
    }

    // ─── Conversions ────────────────────────────────────────────────

    pub fn tilt_to_volt(&self, degree: f32) -> f32 {
        self.cal.tilt_to_volt(degree)
    }

    pub fn volt_to_tilt(&self, volt: f32) -> f32 {
        self.cal.volt_to_tilt(volt)
    }

    fn home_timeout_ms(&self) -> u64 {
        let span_deg = self.cal.max_angle - self.cal.min_angle;
        let ms = (span_deg * self.sec_per_degree() * 1000.0).max(0.0) as u64;
        ms.max(TILT_MIN_HOME_TIMEOUT_MS) + TILT_TIMEOUT_MARGIN_MS
    }

    fn move_timeout_ms(&self, from_volt: f32, to_volt: f32) -> u64 {
        let delta = (self.volt_to_tilt(to_volt) - self.volt_to_tilt(from_volt)).abs();
        let ms = (delta * self.sec_per_degree() * 1000.0) as u64;
        ms.max(TILT_MIN_MOVE_TIMEOUT_MS) + TILT_TIMEOUT_MARGIN_MS
    }

    fn sec_per_degree(&self) -> f32 {
        if self.cal.sec_per_degree > 0.0 {
            self.cal.sec_per_degree
        } else {
            TILT_FALLBACK_SEC_PER_DEGREE
        }
    }

    // ─── Reads ──────────────────────────────────────────────────────

    /// Filtered position in volts.
    pub fn read_volt(&mut self, io: &mut RigIo) -> Result<f32, AxisFault> {
        let adc = io.read_tilt_position()?;
        let volt = f32::from(adc) / ADC_COUNTS_PER_VOLT;
        self.last_volt = Some(volt);
        Ok(volt)
    }

    /// Position in degrees.
    ///
    /// Readings below the actuator's valid range report `min_angle`; a
    /// failed read reports the last good value.
    pub fn read_degree(&mut self, io: &mut RigIo) -> f32 {
        match self.read_volt(io) {
            Ok(volt) if volt < TILT_VALID_MIN_VOLTS => {
                self.last_degree = self.cal.min_angle;
            }
            Ok(volt) => {
                self.last_degree = self.volt_to_tilt(volt);
            }
            Err(e) => {
                debug!(error = %e, last = self.last_degree, "tilt read failed, keeping last degree");
            }
        }
        self.last_degree
    }

    pub fn read_position(&mut self, io: &mut RigIo) -> f32 {
        self.read_degree(io)
    }

    /// Home sensor state. A positive read marks the axis homed.
    pub fn check_home(&mut self, io: &mut RigIo) -> Result<bool, AxisFault> {
        let home = io.read_home_tilt()?;
        if home {
            self.homed = true;
        }
        Ok(home)
    }

    // ─── Homing ─────────────────────────────────────────────────────

    pub fn begin_home(&mut self, io: &mut RigIo) -> AxisResult {
        self.last_fault = None;
        match io.read_home_tilt() {
            Ok(true) => {
                self.homed = true;
                self.set_activity(Activity::Idle);
                info!("Tilt already at home");
                return AxisResult::Ok;
            }
            Ok(false) => {}
            Err(e) => return self.fail(io, AxisFault::Io(e)),
        }

        let now = io.clock().now_ms();
        let adc = match io.read_tilt_position() {
            Ok(adc) => i32::from(adc),
            Err(e) => return self.fail(io, AxisFault::Io(e)),
        };
        let sup = Supervision::new(now, adc, self.home_timeout_ms());
        self.homed = false;
        self.gate.reset();

        if let Err(e) = io.relay_tilt(false, true) {
            return self.fail(io, AxisFault::Io(e));
        }
        self.set_activity(Activity::Homing(sup));
        info!(adc, timeout_ms = sup.timeout_ms, "Tilt homing started");
        AxisResult::Running
    }

    pub fn service_home(&mut self, io: &mut RigIo) -> AxisResult {
        let Activity::Homing(mut sup) = self.activity else {
            if self.homed {
                return AxisResult::Ok;
            }
            return self.record(AxisFault::NotHomed(Axis::Tilt));
        };

        if let Some(result) = self.check_requests(io) {
            return result;
        }
        let now = io.clock().now_ms();
        if !self.gate.admit(now, self.cal.control_time_ms) {
            return AxisResult::Running;
        }

        match io.read_home_tilt() {
            Ok(true) => {
                self.halt(io);
                self.homed = true;
                info!(elapsed_ms = now.saturating_sub(sup.start_ms), "Tilt homed");
                return AxisResult::Ok;
            }
            Ok(false) => {}
            Err(e) => return self.fail(io, AxisFault::Io(e)),
        }

        let adc = match io.read_tilt_position() {
            Ok(adc) => i32::from(adc),
            Err(e) => return self.fail(io, AxisFault::Io(e)),
        };
        self.last_volt = Some(adc as f32 / ADC_COUNTS_PER_VOLT);

        let now = io.clock().now_ms();
        if let Some(fault) = sup.check(now, adc) {
            return self.fail(io, fault);
        }
        debug!(adc, "tilt homing");
        self.activity = Activity::Homing(sup);
        AxisResult::Running
    }

    // ─── Motion ─────────────────────────────────────────────────────

    pub fn begin_move_to_degree(&mut self, io: &mut RigIo, degree: f32) -> AxisResult {
        self.last_fault = None;
        if !degree.is_finite() || degree < self.cal.min_angle || degree > self.cal.max_angle {
            return self.record(AxisFault::OutOfRange {
                value: degree,
                min: self.cal.min_angle,
                max: self.cal.max_angle,
            });
        }
        let volt = self.tilt_to_volt(degree);
        self.begin_move_to_volt(io, volt)
    }

    pub fn begin_move_to_volt(&mut self, io: &mut RigIo, target_volt: f32) -> AxisResult {
        self.last_fault = None;
        if !self.homed {
            return self.record(AxisFault::NotHomed(Axis::Tilt));
        }
        if !target_volt.is_finite()
            || target_volt < self.cal.minimum_volts
            || target_volt > self.cal.maximum_volts
        {
            return self.record(AxisFault::OutOfRange {
                value: target_volt,
                min: self.cal.minimum_volts,
                max: self.cal.maximum_volts,
            });
        }

        let current_adc = match io.read_tilt_position() {
            Ok(adc) => i32::from(adc),
            Err(e) => return self.record(AxisFault::Io(e)),
        };
        let current_volt = current_adc as f32 / ADC_COUNTS_PER_VOLT;
        self.last_volt = Some(current_volt);

        let up = current_volt < target_volt;
        let compensated = if up {
            target_volt - self.cal.stop_band_out
        } else {
            target_volt + self.cal.stop_band_in
        }
        .clamp(self.cal.minimum_volts, self.cal.maximum_volts);
        let target_adc = (compensated * ADC_COUNTS_PER_VOLT) as i32;

        if reached(up, current_adc, target_adc) {
            self.set_activity(Activity::Idle);
            debug!(current_adc, target_adc, "tilt already at target");
            return AxisResult::Ok;
        }

        let now = io.clock().now_ms();
        let sup = Supervision::new(now, current_adc, self.move_timeout_ms(current_volt, compensated));
        self.gate.reset();
        self.shared.clear_resume();

        if let Err(e) = io.relay_tilt(up, true) {
            return self.fail(io, AxisFault::Io(e));
        }
        self.set_activity(Activity::Moving {
            target_adc,
            up,
            sup,
        });
        info!(
            target_volt,
            current_adc,
            target_adc,
            up,
            timeout_ms = sup.timeout_ms,
            "Tilt move started"
        );
        AxisResult::Running
    }

    pub fn service(&mut self, io: &mut RigIo) -> AxisResult {
        let Activity::Moving {
            target_adc,
            up,
            mut sup,
        } = self.activity
        else {
            return AxisResult::Ok;
        };

        if let Some(result) = self.check_requests(io) {
            return result;
        }
        let now = io.clock().now_ms();
        if !self.gate.admit(now, self.cal.control_time_ms) {
            return AxisResult::Running;
        }

        let adc = match io.read_tilt_position() {
            Ok(adc) => i32::from(adc),
            Err(e) => return self.fail(io, AxisFault::Io(e)),
        };
        self.last_volt = Some(adc as f32 / ADC_COUNTS_PER_VOLT);

        if reached(up, adc, target_adc) {
            self.halt(io);
            info!(adc, target_adc, "Tilt target reached");
            return AxisResult::Ok;
        }

        let now = io.clock().now_ms();
        if let Some(fault) = sup.check(now, adc) {
            return self.fail(io, fault);
        }
        debug!(adc, target_adc, "tilt moving");
        self.activity = Activity::Moving {
            target_adc,
            up,
            sup,
        };
        AxisResult::Running
    }

    /// Drop the relay and abandon any homing or move. Always safe to call.
    pub fn pause(&mut self, io: &mut RigIo) {
        let was_active = self.is_active();
        self.halt(io);
        if was_active {
            info!(degree = self.last_degree, "Tilt paused");
        }
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Stop takes precedence over pause.
    fn check_requests(&mut self, io: &mut RigIo) -> Option<AxisResult> {
        if self.shared.stop_requested() {
            self.halt(io);
            info!("Tilt stopped on request");
            return Some(AxisResult::Stopped);
        }
        if self.shared.pause_requested() {
            self.halt(io);
            info!("Tilt paused on request");
            return Some(AxisResult::Paused);
        }
        None
    }

    fn set_activity(&mut self, activity: Activity) {
        self.activity = activity;
        self.shared.set_axis_state(Axis::Tilt, self.state());
    }

    fn halt(&mut self, io: &mut RigIo) {
        if let Err(e) = io.relay_tilt(false, false) {
            warn!(error = %e, "failed to de-energize tilt relay");
        }
        self.set_activity(Activity::Idle);
    }

    fn fail(&mut self, io: &mut RigIo, fault: AxisFault) -> AxisResult {
        self.halt(io);
        self.record(fault)
    }

    fn record(&mut self, fault: AxisFault) -> AxisResult {
        warn!(axis = %Axis::Tilt, %fault, "Tilt fault");
        self.last_fault = Some(fault);
        AxisResult::Error
    }
}

fn reached(up: bool, adc: i32, target_adc: i32) -> bool {
    if up { adc >= target_adc } else { adc <= target_adc }
}

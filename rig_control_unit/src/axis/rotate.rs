//! Rotation axis controller.
//!
//! The turntable has a single home sensor and no encoder, so position is
//! dead-reckoned from elapsed drive time and the calibrated rpm. Two motion
//! modes exist: rotate-by-degrees (time based) and rotate-one, a full turn
//! that ends when the home sensor trips again.

use std::sync::Arc;

use rig_common::consts::{
    DEG_PER_SEC_PER_RPM, ROTATE_FALLBACK_FULL_TIMEOUT_MS, ROTATE_FALLBACK_RPM,
    ROTATE_MIN_DURATION_MS, ROTATE_MIN_FULL_TIMEOUT_MS,
};
use rig_common::control::{Axis, AxisResult, AxisState, RotateCalibration, RotateDirection};
use rig_common::time::TickGate;
use tracing::{debug, info, warn};

use super::AxisFault;
use crate::io::RigIo;
use crate::state::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotateMode {
    #[default]
    None,
    Degree,
    One,
}

/// Sub-state of a rotate-one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOnePhase {
    /// Still on the sensor it started from.
    WaitClear,
    /// Left home, waiting for it to come round again.
    WaitHome,
}

/// One time-based motion.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Motion {
    dir: RotateDirection,
    start_ms: u64,
    start_deg: f32,
    target_deg: f32,
    duration_ms: u64,
    timeout_ms: u64,
}

impl Motion {
    fn fraction(&self, elapsed_ms: u64) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (elapsed_ms as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
    }

    fn position_at(&self, elapsed_ms: u64) -> f32 {
        self.start_deg + self.dir.sign() * self.target_deg * self.fraction(elapsed_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Activity {
    Idle,
    Homing {
        start_ms: u64,
        timeout_ms: u64,
        last_raw: bool,
        last_home: bool,
    },
    Degree(Motion),
    One {
        motion: Motion,
        phase: RotateOnePhase,
        last_raw: bool,
        last_home: bool,
    },
}

/// Controller for the rotation axis.
pub struct RotateController {
    cal: RotateCalibration,
    calibrated: bool,
    homed: bool,
    activity: Activity,
    gate: TickGate,
    est_deg: f32,
    remaining_deg: Option<f32>,
    last_fault: Option<AxisFault>,
    shared: Arc<SharedState>,
}

impl RotateController {
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self {
            cal: RotateCalibration::default(),
            calibrated: false,
            homed: false,
            activity: Activity::Idle,
            gate: TickGate::new(),
            est_deg: 0.0,
            remaining_deg: None,
            last_fault: None,
            shared,
        }
    }

    pub fn apply_calibration(&mut self, cal: RotateCalibration) {
        info!(rpm = cal.rpm, timeout_margin_ms = cal.timeout_margin_ms, "Rotate calibration applied");
        self.cal = cal;
        self.calibrated = true;
    }

    pub fn calibration(&self) -> &RotateCalibration {
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
            AxisState::RunningRotate
        } else {
            AxisState::Idle
        }
    }

    pub fn mode(&self) -> RotateMode {
        match self.activity {
            Activity::Degree(_) => RotateMode::Degree,
            Activity::One { .. } => RotateMode::One,
            _ => RotateMode::None,
        }
    }

    pub fn one_phase(&self) -> Option<RotateOnePhase> {
        match self.activity {
            Activity::One { phase, .. } => Some(phase),
            _ => None,
        }
    }

    pub fn last_fault(&self) -> Option<&AxisFault> {
        self.last_fault.as_ref()
    }

    /// Degrees left of a degree move interrupted by pause.
    pub fn remaining_degrees(&self) -> Option<f32> {
        self.remaining_deg
    }

    // ─── Timing ─────────────────────────────────────────────────────

    fn deg_per_sec(&self) -> f32 {
        let rpm = if self.cal.rpm > 0.0 {
            self.cal.rpm
        } else {
            ROTATE_FALLBACK_RPM
        };
        rpm * DEG_PER_SEC_PER_RPM
    }

    /// Estimated drive time for `degrees`; zero when there is nothing to do.
    pub fn duration_ms(&self, degrees: f32) -> u64 {
        let deg = degrees.abs();
        if !deg.is_finite() || deg <= 0.0 {
            return 0;
        }
        let ms = (deg / self.deg_per_sec() * 1000.0) as u64;
        ms.max(ROTATE_MIN_DURATION_MS)
    }

    pub fn full_rotation_ms(&self) -> u64 {
        (360.0 / self.deg_per_sec() * 1000.0) as u64
    }

    pub fn full_rotation_timeout_ms(&self) -> u64 {
        if self.cal.rpm <= 0.0 {
            return ROTATE_FALLBACK_FULL_TIMEOUT_MS;
        }
        self.full_rotation_ms().max(ROTATE_MIN_FULL_TIMEOUT_MS) + self.cal.timeout_margin_ms
    }

    // ─── Position ───────────────────────────────────────────────────

    /// Dead-reckoned angle, rounded, `0..360`.
    pub fn read_position(&self) -> i32 {
        (self.est_deg.round() as i32).rem_euclid(360)
    }

    /// Milliseconds into the current motion, zero when idle.
    pub fn read_position_tick(&self, io: &RigIo) -> u64 {
        let start = match self.activity {
            Activity::Idle => return 0,
            Activity::Homing { start_ms, .. } => start_ms,
            Activity::Degree(m) | Activity::One { motion: m, .. } => m.start_ms,
        };
        io.clock().elapsed_since(start)
    }

    /// Home sensor state. Reading home re-zeroes the position estimate.
    pub fn check_home(&mut self, io: &mut RigIo) -> Result<bool, AxisFault> {
        let home = io.read_home_rotate()?;
        if home {
            self.homed = true;
            self.est_deg = 0.0;
        }
        Ok(home)
    }

    // ─── Homing ─────────────────────────────────────────────────────

    pub fn begin_home(&mut self, io: &mut RigIo) -> AxisResult {
        self.last_fault = None;
        self.remaining_deg = None;
        let raw = match io.read_home_rotate_raw() {
            Ok(raw) => raw,
            Err(e) => return self.fail(io, AxisFault::Io(e)),
        };
        let home = io.interpret_home_rotate(raw);
        if home {
            self.homed = true;
            self.est_deg = 0.0;
            self.set_activity(Activity::Idle);
            info!("Rotate already at home");
            return AxisResult::Ok;
        }

        let start_ms = io.clock().now_ms();
        let timeout_ms = self.full_rotation_timeout_ms();
        self.homed = false;
        self.gate.reset();
        info!(raw, home, timeout_ms, "Rotate home-start");

        if let Err(e) = io.relay_rotate(true, true) {
            return self.fail(io, AxisFault::Io(e));
        }
        self.set_activity(Activity::Homing {
            start_ms,
            timeout_ms,
            last_raw: raw,
            last_home: home,
        });
        AxisResult::Running
    }

    pub fn service_home(&mut self, io: &mut RigIo) -> AxisResult {
        let Activity::Homing {
            start_ms,
            timeout_ms,
            last_raw,
            last_home,
        } = self.activity
        else {
            if self.homed {
                return AxisResult::Ok;
            }
            return self.record(AxisFault::NotHomed(Axis::Rotate));
        };

        if let Some(result) = self.check_requests(io) {
            return result;
        }
        let now = io.clock().now_ms();
        if !self.gate.admit(now, self.cal.control_time_ms) {
            return AxisResult::Running;
        }

        let raw = match io.read_home_rotate_raw() {
            Ok(raw) => raw,
            Err(e) => return self.fail(io, AxisFault::Io(e)),
        };
        let home = io.interpret_home_rotate(raw);
        if raw != last_raw || home != last_home {
            info!(raw, home, elapsed_ms = now.saturating_sub(start_ms), "Rotate home-change");
        }

        if home {
            self.halt(io);
            self.homed = true;
            self.est_deg = 0.0;
            info!(elapsed_ms = now.saturating_sub(start_ms), "Rotate homed");
            return AxisResult::Ok;
        }
        if now.saturating_sub(start_ms) > timeout_ms {
            return self.fail(io, AxisFault::Timeout { timeout_ms });
        }

        self.activity = Activity::Homing {
            start_ms,
            timeout_ms,
            last_raw: raw,
            last_home: home,
        };
        AxisResult::Running
    }

    // ─── Motion ─────────────────────────────────────────────────────

    /// Rotate `degrees` in `dir`. Zero degrees completes immediately.
    pub fn begin_rotate(&mut self, io: &mut RigIo, dir: RotateDirection, degrees: f32) -> AxisResult {
        self.last_fault = None;
        self.remaining_deg = None;
        let duration_ms = self.duration_ms(degrees);
        self.start_degree(io, dir, degrees, duration_ms)
    }

    /// Finish a paused degree move. The remainder is driven for its exact
    /// time, without the minimum pulse; with nothing remembered this is
    /// [`begin_rotate`](Self::begin_rotate) of `degrees`.
    pub fn resume_rotate(&mut self, io: &mut RigIo, dir: RotateDirection, degrees: f32) -> AxisResult {
        let Some(remaining) = self.remaining_deg else {
            return self.begin_rotate(io, dir, degrees);
        };
        self.last_fault = None;
        self.remaining_deg = None;
        let duration_ms = if remaining.is_finite() && remaining > 0.0 {
            (remaining / self.deg_per_sec() * 1000.0) as u64
        } else {
            0
        };
        if duration_ms == 0 {
            self.est_deg = normalize(self.est_deg + dir.sign() * remaining.max(0.0));
        }
        self.start_degree(io, dir, remaining, duration_ms)
    }

    fn start_degree(
        &mut self,
        io: &mut RigIo,
        dir: RotateDirection,
        degrees: f32,
        duration_ms: u64,
    ) -> AxisResult {
        if duration_ms == 0 {
            debug!(degrees, "rotate: nothing to do");
            return AxisResult::Ok;
        }

        let motion = Motion {
            dir,
            start_ms: io.clock().now_ms(),
            start_deg: self.est_deg,
            target_deg: degrees.abs(),
            duration_ms,
            timeout_ms: duration_ms + self.cal.timeout_margin_ms,
        };
        self.homed = false;
        self.gate.reset();
        self.shared.clear_resume();

        if let Err(e) = io.relay_rotate(dir.is_cw(), true) {
            return self.fail(io, AxisFault::Io(e));
        }
        self.set_activity(Activity::Degree(motion));
        info!(%dir, degrees = motion.target_deg, duration_ms, "Rotate started");
        AxisResult::Running
    }

    /// One full turn, from home back to home.
    pub fn begin_rotate_one(&mut self, io: &mut RigIo, dir: RotateDirection) -> AxisResult {
        self.last_fault = None;
        self.remaining_deg = None;
        let raw = match io.read_home_rotate_raw() {
            Ok(raw) => raw,
            Err(e) => return self.record(AxisFault::Io(e)),
        };
        let home = io.interpret_home_rotate(raw);
        if !home {
            return self.record(AxisFault::NotAtHome);
        }

        let motion = Motion {
            dir,
            start_ms: io.clock().now_ms(),
            start_deg: 0.0,
            target_deg: 360.0,
            duration_ms: self.full_rotation_ms(),
            timeout_ms: self.full_rotation_timeout_ms(),
        };
        self.est_deg = 0.0;
        self.homed = false;
        self.gate.reset();
        self.shared.clear_resume();
        info!(%dir, raw, home, timeout_ms = motion.timeout_ms, "Rotate one-start");

        if let Err(e) = io.relay_rotate(dir.is_cw(), true) {
            return self.fail(io, AxisFault::Io(e));
        }
        self.set_activity(Activity::One {
            motion,
            phase: RotateOnePhase::WaitClear,
            last_raw: raw,
            last_home: home,
        });
        AxisResult::Running
    }

    pub fn service(&mut self, io: &mut RigIo) -> AxisResult {
        if !matches!(self.activity, Activity::Degree(_) | Activity::One { .. }) {
            return AxisResult::Ok;
        }
        if let Some(result) = self.check_requests(io) {
            return result;
        }
        let now = io.clock().now_ms();
        if !self.gate.admit(now, self.cal.control_time_ms) {
            return AxisResult::Running;
        }

        match self.activity {
            Activity::Degree(motion) => self.service_degree(io, motion, now),
            Activity::One {
                motion,
                phase,
                last_raw,
                last_home,
            } => self.service_one(io, motion, phase, (last_raw, last_home), now),
            _ => AxisResult::Ok,
        }
    }

    fn service_degree(&mut self, io: &mut RigIo, motion: Motion, now: u64) -> AxisResult {
        let elapsed = now.saturating_sub(motion.start_ms);
        self.est_deg = motion.position_at(elapsed);

        if elapsed >= motion.duration_ms {
            self.halt(io);
            self.est_deg = normalize(motion.start_deg + motion.dir.sign() * motion.target_deg);
            info!(elapsed_ms = elapsed, position = self.read_position(), "Rotate complete");
            return AxisResult::Ok;
        }
        if elapsed > motion.timeout_ms {
            return self.fail(io, AxisFault::Timeout {
                timeout_ms: motion.timeout_ms,
            });
        }
        debug!(elapsed_ms = elapsed, est_deg = self.est_deg, "rotating");
        AxisResult::Running
    }

    fn service_one(
        &mut self,
        io: &mut RigIo,
        motion: Motion,
        mut phase: RotateOnePhase,
        (last_raw, last_home): (bool, bool),
        now: u64,
    ) -> AxisResult {
        let elapsed = now.saturating_sub(motion.start_ms);
        self.est_deg = motion.position_at(elapsed);

        let raw = match io.read_home_rotate_raw() {
            Ok(raw) => raw,
            Err(e) => return self.fail(io, AxisFault::Io(e)),
        };
        let home = io.interpret_home_rotate(raw);
        if raw != last_raw || home != last_home {
            info!(raw, home, ?phase, elapsed_ms = elapsed, "Rotate one-change");
        }

        match phase {
            RotateOnePhase::WaitClear if !home => {
                phase = RotateOnePhase::WaitHome;
                debug!(elapsed_ms = elapsed, "rotate-one left home");
            }
            RotateOnePhase::WaitHome if home => {
                self.halt(io);
                self.homed = true;
                self.est_deg = 0.0;
                info!(elapsed_ms = elapsed, "Rotate one complete");
                return AxisResult::Ok;
            }
            _ => {}
        }

        if elapsed > motion.timeout_ms {
            return self.fail(io, AxisFault::NoHomeDuringRotate {
                timeout_ms: motion.timeout_ms,
            });
        }
        self.activity = Activity::One {
            motion,
            phase,
            last_raw: raw,
            last_home: home,
        };
        AxisResult::Running
    }

    /// Drop the relay and remember how far a degree move still had to go.
    pub fn pause(&mut self, io: &mut RigIo) {
        if let Activity::Degree(motion) = self.activity {
            let elapsed = io.clock().elapsed_since(motion.start_ms);
            self.est_deg = motion.position_at(elapsed);
            let remaining = motion.target_deg * (1.0 - motion.fraction(elapsed));
            self.remaining_deg = Some(remaining);
            info!(remaining_deg = remaining, "Rotate paused");
        }
        self.halt(io);
    }

    /// Drop the relay and forget the current target.
    pub fn stop(&mut self, io: &mut RigIo) {
        if let Activity::Degree(motion) | Activity::One { motion, .. } = self.activity {
            self.est_deg = motion.position_at(io.clock().elapsed_since(motion.start_ms));
        }
        let was_active = self.is_active();
        self.remaining_deg = None;
        self.halt(io);
        if was_active {
            info!(position = self.read_position(), "Rotate stopped");
        }
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn check_requests(&mut self, io: &mut RigIo) -> Option<AxisResult> {
        if self.shared.stop_requested() {
            self.stop(io);
            return Some(AxisResult::Stopped);
        }
        if self.shared.pause_requested() {
            self.pause(io);
            return Some(AxisResult::Paused);
        }
        None
    }

    fn set_activity(&mut self, activity: Activity) {
        self.activity = activity;
        self.shared.set_axis_state(Axis::Rotate, self.state());
    }

    fn halt(&mut self, io: &mut RigIo) {
        if let Err(e) = io.relay_rotate(false, false) {
            warn!(error = %e, "failed to de-energize rotate relay");
        }
        self.est_deg = normalize(self.est_deg);
        self.set_activity(Activity::Idle);
    }

    fn fail(&mut self, io: &mut RigIo, fault: AxisFault) -> AxisResult {
        self.halt(io);
        self.record(fault)
    }

    fn record(&mut self, fault: AxisFault) -> AxisResult {
        warn!(axis = %Axis::Rotate, %fault, "Rotate fault");
        self.last_fault = Some(fault);
        AxisResult::Error
    }
}

fn normalize(deg: f32) -> f32 {
    deg.rem_euclid(360.0)
}

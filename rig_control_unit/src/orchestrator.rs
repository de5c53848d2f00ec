//! Session orchestrator.
//!
//! Top-level state machine over [`ControlPhase`], gated by
//! [`MachineStatus`]. Commands start work through the controllers' `begin_*`
//! calls; [`tick`](SessionOrchestrator::tick) services whichever controller
//! the current phase names and advances the phase on completion:
//!
//! ```text
//! begin_home:    HomeTilt ─► HomeRotate ─► Idle   (status Ready)
//! start_session: Tilt ─────► Rotate ─────► Done   (status Done)
//! ```
//!
//! ESTOP pre-empts everything: once latched, every tick reports `EStop`
//! until [`init`](SessionOrchestrator::init).

use std::sync::Arc;

use rig_common::config::ConfigError;
use rig_common::control::{
    Axis, AxisResult, ControlPhase, MachineStatus, RotateDirection, SessionConfig,
};
use rig_common::io::IoError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::axis::{AxisFault, RotateController, TiltController};
use crate::calibration::{CalibrationError, CalibrationStore};
use crate::io::RigIo;
use crate::state::SharedState;

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("{command} not accepted while {status}")]
    InvalidState {
        command: &'static str,
        status: MachineStatus,
    },

    #[error("emergency stop is latched")]
    EStop,

    #[error("invalid session: {0}")]
    InvalidSession(#[from] ConfigError),

    #[error("calibration: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("{axis} axis: {fault}")]
    Axis { axis: Axis, fault: AxisFault },

    #[error("I/O failure: {0}")]
    Io(#[from] IoError),

    /// A blocking helper ended without reaching its goal.
    #[error("operation ended in {0}")]
    Interrupted(MachineStatus),
}

// ─── Orchestrator ───────────────────────────────────────────────────

pub struct SessionOrchestrator {
    io: RigIo,
    tilt: TiltController,
    rotate: RotateController,
    shared: Arc<SharedState>,
    store: Box<dyn CalibrationStore>,
    status: MachineStatus,
    phase: ControlPhase,
    session: Option<SessionConfig>,
    last_fault: Option<(Axis, AxisFault)>,
    tick_interval_ms: u64,
}

impl SessionOrchestrator {
    pub fn new(io: RigIo, store: Box<dyn CalibrationStore>, tick_interval_ms: u64) -> Self {
        let shared = Arc::new(SharedState::new());
        Self {
            tilt: TiltController::new(Arc::clone(&shared)),
            rotate: RotateController::new(Arc::clone(&shared)),
            io,
            shared,
            store,
            status: MachineStatus::Ready,
            phase: ControlPhase::Idle,
            session: None,
            last_fault: None,
            tick_interval_ms,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn phase(&self) -> ControlPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&SessionConfig> {
        self.session.as_ref()
    }

    /// Handle for other contexts: pause/stop requests and the ESTOP latch.
    pub fn shared(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    pub fn tilt(&self) -> &TiltController {
        &self.tilt
    }

    pub fn rotate(&self) -> &RotateController {
        &self.rotate
    }

    pub fn io(&self) -> &RigIo {
        &self.io
    }

    /// Axis and reason behind the most recent `Fault`, if an axis caused it.
    pub fn last_fault(&self) -> Option<&(Axis, AxisFault)> {
        self.last_fault.as_ref()
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Back to Ready/Idle with outputs off. The only way to clear ESTOP.
    pub fn init(&mut self) {
        self.tilt.pause(&mut self.io);
        self.rotate.stop(&mut self.io);
        if let Err(e) = self.io.all_off() {
            warn!(error = %e, "init: failed to clear relays");
        }
        self.shared.reset();
        self.session = None;
        self.last_fault = None;
        self.phase = ControlPhase::Idle;
        self.set_status(MachineStatus::Ready);
        info!(driver = self.io.driver_name(), "Orchestrator initialized");
    }

    /// Latch ESTOP. Takes effect on the next tick or command.
    pub fn notify_estop_active(&self) {
        if !self.shared.estop_latched() {
            warn!("ESTOP latched");
        }
        self.shared.latch_estop();
    }

    /// Sample the ESTOP input and latch on an active or unreadable input.
    pub fn poll_estop_input(&mut self) -> Result<bool, ControlError> {
        match self.io.read_estop() {
            Ok(active) => {
                if active {
                    self.notify_estop_active();
                }
                Ok(active)
            }
            Err(e) => {
                self.notify_estop_active();
                Err(e.into())
            }
        }
    }

    /// One control step. Never blocks.
    pub fn tick(&mut self) -> MachineStatus {
        if self.shared.estop_latched() {
            self.enter_estop();
            return self.status;
        }
        if self.status != MachineStatus::Running {
            return self.status;
        }

        let outcome = match self.phase {
            ControlPhase::HomeTilt => {
                let r = self.tilt.service_home(&mut self.io);
                match r {
                    AxisResult::Ok => self.begin_rotate_home(),
                    AxisResult::Running => Ok(()),
                    other => self.interrupted(Axis::Tilt, other),
                }
            }
            ControlPhase::HomeRotate => {
                let r = self.rotate.service_home(&mut self.io);
                match r {
                    AxisResult::Ok => {
                        self.finish_homing();
                        Ok(())
                    }
                    AxisResult::Running => Ok(()),
                    other => self.interrupted(Axis::Rotate, other),
                }
            }
            ControlPhase::Tilt => {
                let r = self.tilt.service(&mut self.io);
                match r {
                    AxisResult::Ok => match self.session {
                        Some(cfg) => self.begin_rotate_phase(cfg.rotate_dir, cfg.rotate_num as f32),
                        None => self.fault_without_session(),
                    },
                    AxisResult::Running => Ok(()),
                    other => self.interrupted(Axis::Tilt, other),
                }
            }
            ControlPhase::Rotate => {
                let r = self.rotate.service(&mut self.io);
                match r {
                    AxisResult::Ok => {
                        self.finish_session();
                        Ok(())
                    }
                    AxisResult::Running => Ok(()),
                    other => self.interrupted(Axis::Rotate, other),
                }
            }
            ControlPhase::Idle | ControlPhase::Done => {
                warn!(phase = ?self.phase, "running with no active phase");
                self.fault_idle();
                Ok(())
            }
        };
        if let Err(e) = outcome {
            debug!(error = %e, "tick ended in fault");
        }
        self.status
    }

    // ─── Checks & Calibration ───────────────────────────────────────

    pub fn check_calibration(&mut self) -> Result<(), ControlError> {
        for (axis, ok) in [
            (Axis::Tilt, self.tilt.is_calibrated()),
            (Axis::Rotate, self.rotate.is_calibrated()),
        ] {
            if !ok {
                return Err(self.fail_axis(axis, AxisFault::NotCalibrated(axis)));
            }
        }
        Ok(())
    }

    /// Both axes must be sitting on their home sensors.
    pub fn check_home(&mut self) -> Result<(), ControlError> {
        let tilt = self.tilt.check_home(&mut self.io);
        let rotate = self.rotate.check_home(&mut self.io);
        for (axis, result) in [(Axis::Tilt, tilt), (Axis::Rotate, rotate)] {
            match result {
                Ok(true) => {}
                Ok(false) => return Err(self.fail_axis(axis, AxisFault::NotHomed(axis))),
                Err(fault) => return Err(self.fail_axis(axis, fault)),
            }
        }
        Ok(())
    }

    pub fn calibrate_tilt(&mut self) -> Result<(), ControlError> {
        match self.store.load_tilt_calibration() {
            Ok(cal) => {
                self.tilt.apply_calibration(cal);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "tilt calibration unavailable");
                self.fault_idle();
                Err(e.into())
            }
        }
    }

    pub fn calibrate_rotate(&mut self) -> Result<(), ControlError> {
        match self.store.load_rotate_calibration() {
            Ok(cal) => {
                self.rotate.apply_calibration(cal);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "rotate calibration unavailable");
                self.fault_idle();
                Err(e.into())
            }
        }
    }

    // ─── Homing ─────────────────────────────────────────────────────

    pub fn begin_home(&mut self) -> Result<(), ControlError> {
        self.require(self.status.accepts_commands(), "home")?;
        self.shared.clear_commands();
        self.last_fault = None;
        info!("Homing started");
        self.begin_tilt_home()
    }

    /// Blocking convenience: [`begin_home`](Self::begin_home), then tick at
    /// the configured interval until homing ends.
    pub fn home(&mut self) -> Result<(), ControlError> {
        self.begin_home()?;
        let clock = Arc::clone(self.io.clock());
        while self.status == MachineStatus::Running {
            clock.sleep(self.tick_interval_ms);
            self.tick();
        }
        match self.status {
            MachineStatus::Ready => Ok(()),
            MachineStatus::EStop => Err(ControlError::EStop),
            status => Err(self.reason_or(status)),
        }
    }

    fn begin_tilt_home(&mut self) -> Result<(), ControlError> {
        match self.tilt.begin_home(&mut self.io) {
            AxisResult::Ok => self.begin_rotate_home(),
            AxisResult::Running => {
                self.enter(ControlPhase::HomeTilt);
                Ok(())
            }
            other => self.interrupted(Axis::Tilt, other),
        }
    }

    fn begin_rotate_home(&mut self) -> Result<(), ControlError> {
        match self.rotate.begin_home(&mut self.io) {
            AxisResult::Ok => {
                self.finish_homing();
                Ok(())
            }
            AxisResult::Running => {
                self.enter(ControlPhase::HomeRotate);
                Ok(())
            }
            other => self.interrupted(Axis::Rotate, other),
        }
    }

    fn finish_homing(&mut self) {
        self.phase = ControlPhase::Idle;
        self.set_status(MachineStatus::Ready);
        info!("Homing complete");
    }

    // ─── Session ────────────────────────────────────────────────────

    pub fn start_session(&mut self, cfg: SessionConfig) -> Result<(), ControlError> {
        self.require(self.status.accepts_commands(), "start_session")?;
        if let Err(e) = cfg.validate() {
            warn!(error = %e, "session rejected");
            self.fault_idle();
            return Err(e.into());
        }
        self.check_calibration()?;
        self.check_home()?;

        self.session = Some(cfg);
        self.shared.clear_commands();
        self.last_fault = None;
        info!(
            tilt_degree = cfg.tilt_degree,
            rotate_dir = %cfg.rotate_dir,
            rotate_num = cfg.rotate_num,
            "Session started"
        );
        self.begin_tilt_phase(cfg)
    }

    fn begin_tilt_phase(&mut self, cfg: SessionConfig) -> Result<(), ControlError> {
        match self.tilt.begin_move_to_degree(&mut self.io, cfg.tilt_degree as f32) {
            AxisResult::Ok => self.begin_rotate_phase(cfg.rotate_dir, cfg.rotate_num as f32),
            AxisResult::Running => {
                self.enter(ControlPhase::Tilt);
                Ok(())
            }
            other => self.interrupted(Axis::Tilt, other),
        }
    }

    fn begin_rotate_phase(&mut self, dir: RotateDirection, degrees: f32) -> Result<(), ControlError> {
        let result = self.rotate.begin_rotate(&mut self.io, dir, degrees);
        self.enter_rotate_phase(result)
    }

    fn enter_rotate_phase(&mut self, result: AxisResult) -> Result<(), ControlError> {
        match result {
            AxisResult::Ok => {
                self.finish_session();
                Ok(())
            }
            AxisResult::Running => {
                self.enter(ControlPhase::Rotate);
                Ok(())
            }
            other => self.interrupted(Axis::Rotate, other),
        }
    }

    fn finish_session(&mut self) {
        self.session = None;
        self.phase = ControlPhase::Done;
        self.set_status(MachineStatus::Done);
        info!(position = self.rotate.read_position(), "Session done");
    }

    /// Halt both axes, keeping phase and target for resume.
    pub fn pause_session(&mut self) -> Result<(), ControlError> {
        self.require(self.status == MachineStatus::Running, "pause")?;
        self.tilt.pause(&mut self.io);
        self.rotate.pause(&mut self.io);
        self.set_status(MachineStatus::Paused);
        Ok(())
    }

    /// Re-issue the begin call of the paused phase.
    pub fn resume_session(&mut self) -> Result<(), ControlError> {
        self.require(self.status == MachineStatus::Paused, "resume")?;
        self.shared.clear_commands();
        info!(phase = ?self.phase, "Resuming");
        match (self.phase, self.session) {
            (ControlPhase::HomeTilt, _) => self.begin_tilt_home(),
            (ControlPhase::HomeRotate, _) => self.begin_rotate_home(),
            (ControlPhase::Tilt, Some(cfg)) => self.begin_tilt_phase(cfg),
            (ControlPhase::Rotate, Some(cfg)) => {
                let result =
                    self.rotate
                        .resume_rotate(&mut self.io, cfg.rotate_dir, cfg.rotate_num as f32);
                self.enter_rotate_phase(result)
            }
            _ => self.fault_without_session(),
        }
    }

    /// Always succeeds. Ends any session in `Fault`.
    pub fn stop_session(&mut self) {
        self.tilt.pause(&mut self.io);
        self.rotate.stop(&mut self.io);
        self.session = None;
        self.phase = ControlPhase::Idle;
        if self.status != MachineStatus::EStop {
            self.set_status(MachineStatus::Fault);
        }
        info!("Session stopped");
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn set_status(&mut self, status: MachineStatus) {
        if self.status != status {
            info!(from = %self.status, to = %status, phase = ?self.phase, "Status change");
            self.status = status;
        }
    }

    fn enter(&mut self, phase: ControlPhase) {
        debug!(from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
        self.set_status(MachineStatus::Running);
    }

    /// Both axes off, session dropped, `Fault` unless ESTOP owns the status.
    fn fault_idle(&mut self) {
        self.tilt.pause(&mut self.io);
        self.rotate.stop(&mut self.io);
        self.session = None;
        self.phase = ControlPhase::Idle;
        if self.status != MachineStatus::EStop {
            self.set_status(MachineStatus::Fault);
        }
    }

    fn fail_axis(&mut self, axis: Axis, fault: AxisFault) -> ControlError {
        warn!(%axis, %fault, "axis check failed");
        self.last_fault = Some((axis, fault.clone()));
        self.fault_idle();
        ControlError::Axis { axis, fault }
    }

    fn fault_without_session(&mut self) -> Result<(), ControlError> {
        warn!(phase = ?self.phase, "no session to continue");
        let status = self.status;
        self.fault_idle();
        Err(ControlError::Interrupted(status))
    }

    /// Map a non-Ok, non-Running controller result onto status and phase.
    fn interrupted(&mut self, axis: Axis, result: AxisResult) -> Result<(), ControlError> {
        match result {
            AxisResult::Paused => {
                self.set_status(MachineStatus::Paused);
                info!(%axis, phase = ?self.phase, "Paused by request");
                Ok(())
            }
            AxisResult::Stopped => {
                info!(%axis, "Stopped by request");
                self.fault_idle();
                Err(ControlError::Interrupted(MachineStatus::Fault))
            }
            _ => {
                let fault = match axis {
                    Axis::Tilt => self.tilt.last_fault(),
                    Axis::Rotate => self.rotate.last_fault(),
                }
                .cloned();
                let err = match fault {
                    Some(fault) => {
                        self.last_fault = Some((axis, fault.clone()));
                        ControlError::Axis { axis, fault }
                    }
                    None => ControlError::Interrupted(MachineStatus::Fault),
                };
                error!(%axis, error = %err, phase = ?self.phase, "Axis fault");
                self.fault_idle();
                Err(err)
            }
        }
    }

    /// De-energize both axes and drop the session. Once per latch.
    fn enter_estop(&mut self) {
        if self.status == MachineStatus::EStop {
            return;
        }
        self.tilt.pause(&mut self.io);
        self.rotate.stop(&mut self.io);
        self.session = None;
        self.phase = ControlPhase::Idle;
        self.set_status(MachineStatus::EStop);
        error!("ESTOP: motion halted");
    }

    /// Reject a command while ESTOP is latched or in the wrong state.
    fn require(&mut self, ok: bool, command: &'static str) -> Result<(), ControlError> {
        if self.shared.estop_latched() || self.status == MachineStatus::EStop {
            warn!(command, "rejected: ESTOP latched");
            self.enter_estop();
            return Err(ControlError::EStop);
        }
        if ok {
            return Ok(());
        }
        let status = self.status;
        warn!(command, %status, "command rejected");
        self.fault_idle();
        Err(ControlError::InvalidState { command, status })
    }

    fn reason_or(&self, status: MachineStatus) -> ControlError {
        match &self.last_fault {
            Some((axis, fault)) => ControlError::Axis {
                axis: *axis,
                fault: fault.clone(),
            },
            None => ControlError::Interrupted(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::MemoryCalibrationStore;
    use rig_common::config::ChannelMap;
    use rig_common::control::{RotateCalibration, TiltCalibration};
    use rig_common::time::{Clock, ManualClock};
    use rig_hal::{SimProbe, SimulatedRig, SimulationConfig};

    fn rig(sim: SimulationConfig, store: MemoryCalibrationStore) -> (SessionOrchestrator, SimProbe, ManualClock) {
        let clock = ManualClock::new();
        let driver = SimulatedRig::new(&sim, ChannelMap::default(), Arc::new(clock.clone()));
        let probe = driver.probe();
        let io = RigIo::new(Box::new(driver), ChannelMap::default(), Arc::new(clock.clone()), 1);
        let mut orch = SessionOrchestrator::new(io, Box::new(store), 100);
        orch.init();
        (orch, probe, clock)
    }

    fn calibrated(sim: SimulationConfig) -> (SessionOrchestrator, SimProbe, ManualClock) {
        let (mut orch, probe, clock) = rig(sim, MemoryCalibrationStore::calibrated());
        orch.calibrate_tilt().unwrap();
        orch.calibrate_rotate().unwrap();
        (orch, probe, clock)
    }

    fn tick_until_settled(orch: &mut SessionOrchestrator, clock: &ManualClock) -> MachineStatus {
        for _ in 0..20_000 {
            if orch.status() != MachineStatus::Running {
                break;
            }
            clock.advance(100);
            orch.tick();
        }
        orch.status()
    }

    #[test]
    fn init_state() {
        let (orch, _, _) = rig(SimulationConfig::default(), MemoryCalibrationStore::default());
        assert_eq!(orch.status(), MachineStatus::Ready);
        assert_eq!(orch.phase(), ControlPhase::Idle);
        assert!(orch.session().is_none());
    }

    #[test]
    fn missing_calibration_faults() {
        let store = MemoryCalibrationStore::new(Some(TiltCalibration::default()), None);
        let (mut orch, _, _) = rig(SimulationConfig::homed(), store);
        orch.calibrate_tilt().unwrap();
        assert!(matches!(orch.calibrate_rotate(), Err(ControlError::Calibration(_))));
        assert_eq!(orch.status(), MachineStatus::Fault);

        orch.init();
        assert!(matches!(
            orch.check_calibration(),
            Err(ControlError::Axis {
                axis: Axis::Rotate,
                fault: AxisFault::NotCalibrated(Axis::Rotate)
            })
        ));
        assert_eq!(orch.status(), MachineStatus::Fault);
    }

    #[test]
    fn home_completes_synchronously_when_on_sensors() {
        let (mut orch, probe, _) = calibrated(SimulationConfig::homed());
        orch.begin_home().unwrap();
        assert_eq!(orch.status(), MachineStatus::Ready);
        assert_eq!(orch.phase(), ControlPhase::Idle);
        assert_eq!(probe.tilt_enable_edges(), (0, 0));
        assert_eq!(probe.rotate_enable_edges(), (0, 0));
    }

    #[test]
    fn home_sequences_tilt_then_rotate() {
        let (mut orch, probe, clock) = calibrated(SimulationConfig::default());
        orch.begin_home().unwrap();
        assert_eq!(orch.phase(), ControlPhase::HomeTilt);
        assert_eq!(orch.status(), MachineStatus::Running);

        while orch.phase() == ControlPhase::HomeTilt {
            clock.advance(100);
            orch.tick();
        }
        assert_eq!(orch.phase(), ControlPhase::HomeRotate);
        assert!(probe.tilt_at_home());
        assert!(probe.rotate_energized());

        assert_eq!(tick_until_settled(&mut orch, &clock), MachineStatus::Ready);
        assert!(orch.tilt().is_homed());
        assert!(orch.rotate().is_homed());
        assert!(orch.check_home().is_ok());
    }

    #[test]
    fn blocking_home_uses_clock() {
        let (mut orch, _, clock) = calibrated(SimulationConfig::default());
        orch.home().unwrap();
        assert_eq!(orch.status(), MachineStatus::Ready);
        // tilt ~6 s then rotate ~45 s from the default start
        assert!(clock.now_ms() > 40_000);
    }

    #[test]
    fn home_rejected_while_running() {
        let (mut orch, _, _) = calibrated(SimulationConfig::default());
        orch.begin_home().unwrap();
        assert!(matches!(
            orch.begin_home(),
            Err(ControlError::InvalidState { command: "home", status: MachineStatus::Running })
        ));
        assert_eq!(orch.status(), MachineStatus::Fault);
    }

    #[test]
    fn session_requires_home() {
        let (mut orch, probe, _) = calibrated(SimulationConfig::default());
        let err = orch
            .start_session(SessionConfig::new(30, RotateDirection::Cw, 90))
            .unwrap_err();
        assert!(matches!(err, ControlError::Axis { fault: AxisFault::NotHomed(_), .. }));
        assert_eq!(orch.status(), MachineStatus::Fault);
        assert!(probe.relays().is_empty());
    }

    #[test]
    fn invalid_session_rejected() {
        let (mut orch, _, _) = calibrated(SimulationConfig::homed());
        for cfg in [
            SessionConfig::new(91, RotateDirection::Cw, 0),
            SessionConfig::new(-1, RotateDirection::Cw, 0),
            SessionConfig::new(10, RotateDirection::Ccw, -5),
        ] {
            orch.init();
            assert!(matches!(orch.start_session(cfg), Err(ControlError::InvalidSession(_))));
            assert_eq!(orch.status(), MachineStatus::Fault);
        }
    }

    #[test]
    fn zero_motion_session_is_done_immediately() {
        let (mut orch, probe, _) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(0, RotateDirection::Cw, 0)).unwrap();
        assert_eq!(orch.status(), MachineStatus::Done);
        assert_eq!(orch.phase(), ControlPhase::Done);
        assert!(orch.session().is_none());
        assert_eq!(probe.rotate_enable_edges(), (0, 0));
    }

    #[test]
    fn session_runs_tilt_then_rotate() {
        let (mut orch, probe, clock) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(30, RotateDirection::Cw, 90)).unwrap();
        assert_eq!(orch.phase(), ControlPhase::Tilt);
        assert_eq!(orch.session().map(|s| s.rotate_num), Some(90));

        while orch.phase() == ControlPhase::Tilt {
            clock.advance(100);
            orch.tick();
        }
        assert_eq!(orch.phase(), ControlPhase::Rotate);
        assert!(!probe.tilt_energized());
        assert!(probe.rotate_energized());

        assert_eq!(tick_until_settled(&mut orch, &clock), MachineStatus::Done);
        assert_eq!(orch.rotate().read_position(), 90);
        assert!(!probe.rotate_energized());
    }

    #[test]
    fn pause_and_resume_rotate_phase() {
        let (mut orch, probe, clock) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(0, RotateDirection::Cw, 180)).unwrap();
        assert_eq!(orch.phase(), ControlPhase::Rotate);

        clock.advance(10_000);
        orch.tick();
        orch.pause_session().unwrap();
        assert_eq!(orch.status(), MachineStatus::Paused);
        assert!(!probe.rotate_energized());
        assert!(!probe.tilt_energized());

        // ticks while paused do nothing
        clock.advance(5000);
        assert_eq!(orch.tick(), MachineStatus::Paused);

        orch.resume_session().unwrap();
        assert_eq!(orch.status(), MachineStatus::Running);
        assert_eq!(orch.phase(), ControlPhase::Rotate);
        let resumed_at = clock.now_ms();
        assert_eq!(tick_until_settled(&mut orch, &clock), MachineStatus::Done);
        // 120 degrees left at 6 deg/s
        assert_eq!(clock.now_ms() - resumed_at, 20_000);
        assert_eq!(orch.rotate().read_position(), 180);
    }

    #[test]
    fn resume_near_end_of_rotate_does_not_overshoot() {
        let (mut orch, probe, clock) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(0, RotateDirection::Cw, 180)).unwrap();
        clock.advance(29_950);
        orch.tick();
        orch.pause_session().unwrap();
        let remaining = orch.rotate().remaining_degrees().unwrap();
        assert!(remaining < 1.0, "remaining {remaining}");

        orch.resume_session().unwrap();
        assert_eq!(tick_until_settled(&mut orch, &clock), MachineStatus::Done);
        assert_eq!(orch.rotate().read_position(), 180);
        assert!(probe.rotate_angle() < 180.5, "angle {}", probe.rotate_angle());
    }

    #[test]
    fn pause_request_flag_pauses_on_next_tick() {
        let (mut orch, probe, clock) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(40, RotateDirection::Cw, 10)).unwrap();
        orch.shared().request_pause();
        clock.advance(100);
        assert_eq!(orch.tick(), MachineStatus::Paused);
        assert_eq!(orch.phase(), ControlPhase::Tilt);
        assert!(!probe.tilt_energized());

        orch.resume_session().unwrap();
        assert!(!orch.shared().pause_requested());
        assert_eq!(tick_until_settled(&mut orch, &clock), MachineStatus::Done);
    }

    #[test]
    fn pause_outside_running_faults() {
        let (mut orch, _, _) = calibrated(SimulationConfig::homed());
        assert!(orch.pause_session().is_err());
        assert_eq!(orch.status(), MachineStatus::Fault);
        orch.init();
        assert!(orch.resume_session().is_err());
        assert_eq!(orch.status(), MachineStatus::Fault);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut orch, probe, clock) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(30, RotateDirection::Ccw, 90)).unwrap();
        clock.advance(100);
        orch.tick();
        orch.stop_session();
        assert_eq!(orch.status(), MachineStatus::Fault);
        assert_eq!(orch.phase(), ControlPhase::Idle);
        assert!(probe.relays().is_empty());
        orch.stop_session();
        assert_eq!(orch.status(), MachineStatus::Fault);
        assert_eq!(orch.phase(), ControlPhase::Idle);
        assert!(orch.session().is_none());
    }

    #[test]
    fn stop_request_flag_faults() {
        let (mut orch, _, clock) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(30, RotateDirection::Cw, 90)).unwrap();
        orch.shared().request_stop();
        clock.advance(100);
        assert_eq!(orch.tick(), MachineStatus::Fault);
        assert_eq!(orch.phase(), ControlPhase::Idle);
    }

    #[test]
    fn estop_preempts_and_sticks_until_init() {
        let (mut orch, probe, clock) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(30, RotateDirection::Cw, 90)).unwrap();
        assert!(probe.tilt_energized());

        orch.notify_estop_active();
        assert_eq!(orch.tick(), MachineStatus::EStop);
        assert!(probe.relays().is_empty());

        for _ in 0..5 {
            clock.advance(100);
            assert_eq!(orch.tick(), MachineStatus::EStop);
        }
        assert!(matches!(orch.begin_home(), Err(ControlError::EStop)));
        orch.stop_session();
        assert_eq!(orch.status(), MachineStatus::EStop);

        orch.init();
        assert_eq!(orch.status(), MachineStatus::Ready);
        assert_eq!(orch.tick(), MachineStatus::Ready);
    }

    #[test]
    fn estop_latch_refuses_commands_before_tick() {
        let (mut orch, probe, _) = calibrated(SimulationConfig::homed());
        orch.shared().latch_estop();
        assert!(matches!(
            orch.start_session(SessionConfig::new(30, RotateDirection::Cw, 90)),
            Err(ControlError::EStop)
        ));
        assert!(matches!(orch.begin_home(), Err(ControlError::EStop)));
        assert_eq!(orch.status(), MachineStatus::EStop);
        assert!(orch.session().is_none());
        assert!(probe.relays().is_empty());

        orch.init();
        orch.start_session(SessionConfig::new(30, RotateDirection::Cw, 90)).unwrap();
        orch.pause_session().unwrap();
        orch.notify_estop_active();
        assert!(matches!(orch.resume_session(), Err(ControlError::EStop)));
        assert_eq!(orch.status(), MachineStatus::EStop);
        assert!(probe.relays().is_empty());
    }

    #[test]
    fn estop_latch_halts_on_pause_before_tick() {
        let (mut orch, probe, _) = calibrated(SimulationConfig::homed());
        orch.start_session(SessionConfig::new(30, RotateDirection::Cw, 90)).unwrap();
        assert!(probe.tilt_energized());

        orch.shared().latch_estop();
        assert!(matches!(orch.pause_session(), Err(ControlError::EStop)));
        assert!(probe.relays().is_empty());
        assert_eq!(orch.phase(), ControlPhase::Idle);
        assert_eq!(orch.tick(), MachineStatus::EStop);
    }

    #[test]
    fn estop_input_latches() {
        let (mut orch, probe, _) = calibrated(SimulationConfig::homed());
        assert!(!orch.poll_estop_input().unwrap());
        probe.set_estop(true);
        assert!(orch.poll_estop_input().unwrap());
        assert_eq!(orch.tick(), MachineStatus::EStop);

        // releasing the button does not clear the latch
        probe.set_estop(false);
        orch.poll_estop_input().unwrap();
        assert_eq!(orch.tick(), MachineStatus::EStop);
    }

    #[test]
    fn unreadable_estop_input_latches() {
        let (mut orch, probe, _) = calibrated(SimulationConfig::homed());
        probe.inject_fault(rig_common::io::PointKind::DigitalIn, 4);
        assert!(matches!(orch.poll_estop_input(), Err(ControlError::Io(_))));
        assert!(orch.shared().estop_latched());
    }

    #[test]
    fn tilt_stall_becomes_fault() {
        let (mut orch, probe, clock) = calibrated(SimulationConfig::homed());
        probe.set_tilt_stuck(true);
        orch.start_session(SessionConfig::new(30, RotateDirection::Cw, 90)).unwrap();
        assert_eq!(tick_until_settled(&mut orch, &clock), MachineStatus::Fault);
        assert_eq!(orch.phase(), ControlPhase::Idle);
        assert!(matches!(orch.last_fault(), Some((Axis::Tilt, AxisFault::Stall { .. }))));
        assert!(probe.relays().is_empty());
    }

    #[test]
    fn target_beyond_calibrated_range_faults() {
        let (mut orch, probe, _) = calibrated(SimulationConfig::homed());
        let err = orch
            .start_session(SessionConfig::new(80, RotateDirection::Cw, 90))
            .unwrap_err();
        assert!(matches!(err, ControlError::Axis { fault: AxisFault::OutOfRange { .. }, .. }));
        assert_eq!(orch.status(), MachineStatus::Fault);
        assert_eq!(probe.tilt_enable_edges(), (0, 0));
    }

    #[test]
    fn custom_calibration_is_applied() {
        let store = MemoryCalibrationStore::new(
            Some(TiltCalibration::default().with_stop_band(0.1)),
            Some(RotateCalibration {
                rpm: 2.0,
                ..RotateCalibration::default()
            }),
        );
        let (mut orch, _, _) = rig(SimulationConfig::homed(), store);
        orch.calibrate_tilt().unwrap();
        orch.calibrate_rotate().unwrap();
        assert_eq!(orch.tilt().calibration().stop_band_in, 0.1);
        assert_eq!(orch.rotate().duration_ms(180.0), 15_000);
    }
}

//! Shared machine state.
//!
//! The only cross-component mutable state: command flags raised by the
//! caller (or another thread) and consumed by the controllers, the ESTOP
//! latch, and a read-only projection of each axis' state.
//!
//! Field ownership:
//!
//! | Field | Written by |
//! |-------|------------|
//! | `pause_requested`, `resume_requested`, `stop_requested` | caller / orchestrator |
//! | `estop_latched` | any context; cleared only by orchestrator `init` |
//! | `tilt_state` | TiltController |
//! | `rotate_state` | RotateController |

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use rig_common::control::{Axis, AxisState};

#[derive(Debug, Default)]
pub struct SharedState {
    pause_requested: AtomicBool,
    resume_requested: AtomicBool,
    stop_requested: AtomicBool,
    estop_latched: AtomicBool,
    tilt_state: AtomicU8,
    rotate_state: AtomicU8,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Command Flags ──────────────────────────────────────────────

    pub fn request_pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    pub fn request_resume(&self) {
        self.resume_requested.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::SeqCst)
    }

    pub fn resume_requested(&self) -> bool {
        self.resume_requested.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Consumed when a move (re)starts.
    pub fn clear_resume(&self) {
        self.resume_requested.store(false, Ordering::SeqCst);
    }

    /// Clear pause/resume/stop. The ESTOP latch is untouched.
    pub fn clear_commands(&self) {
        self.pause_requested.store(false, Ordering::SeqCst);
        self.resume_requested.store(false, Ordering::SeqCst);
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    // ─── ESTOP ──────────────────────────────────────────────────────

    /// One-way latch. Safe to call from any thread or signal context.
    pub fn latch_estop(&self) {
        self.estop_latched.store(true, Ordering::SeqCst);
    }

    pub fn estop_latched(&self) -> bool {
        self.estop_latched.load(Ordering::SeqCst)
    }

    // ─── Axis Projection ────────────────────────────────────────────

    pub fn set_axis_state(&self, axis: Axis, state: AxisState) {
        self.slot(axis).store(state as u8, Ordering::SeqCst);
    }

    pub fn axis_state(&self, axis: Axis) -> AxisState {
        AxisState::from_u8(self.slot(axis).load(Ordering::SeqCst)).unwrap_or_default()
    }

    pub fn tilt_state(&self) -> AxisState {
        self.axis_state(Axis::Tilt)
    }

    pub fn rotate_state(&self) -> AxisState {
        self.axis_state(Axis::Rotate)
    }

    fn slot(&self, axis: Axis) -> &AtomicU8 {
        match axis {
            Axis::Tilt => &self.tilt_state,
            Axis::Rotate => &self.rotate_state,
        }
    }

    /// Back to power-on values, ESTOP latch included.
    pub fn reset(&self) {
        self.clear_commands();
        self.estop_latched.store(false, Ordering::SeqCst);
        self.set_axis_state(Axis::Tilt, AxisState::Idle);
        self.set_axis_state(Axis::Rotate, AxisState::Idle);
    }
}

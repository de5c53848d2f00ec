//! Observation and fault-injection handle for a [`SimulatedRig`].
//!
//! [`SimulatedRig`]: super::SimulatedRig

use std::sync::{Arc, Mutex, MutexGuard};

use rig_common::io::PointKind;
use rig_common::time::Clock;

use super::process_image::RelayImage;
use super::rig::SimState;

/// Cloneable view into the simulated rig.
///
/// Reads bring the physics up to the current clock first, so a probe sees
/// the same world the controllers would.
#[derive(Clone)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
    clock: Arc<dyn Clock>,
}

impl SimProbe {
    pub(crate) fn new(state: Arc<Mutex<SimState>>, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.integrate(self.clock.now_ms());
        state
    }

    // ─── Observation ────────────────────────────────────────────────

    pub fn relays(&self) -> RelayImage {
        self.lock().image.relays()
    }

    pub fn tilt_energized(&self) -> bool {
        let s = self.lock();
        s.image.relay(s.channels.ro_tilt_enable).unwrap_or(false)
    }

    pub fn rotate_energized(&self) -> bool {
        let s = self.lock();
        s.image.relay(s.channels.ro_rotate_enable).unwrap_or(false)
    }

    /// `(rising, falling)` edges on the tilt enable relay.
    pub fn tilt_enable_edges(&self) -> (u32, u32) {
        let s = self.lock();
        s.image.edges(s.channels.ro_tilt_enable)
    }

    /// `(rising, falling)` edges on the rotate enable relay.
    pub fn rotate_enable_edges(&self) -> (u32, u32) {
        let s = self.lock();
        s.image.edges(s.channels.ro_rotate_enable)
    }

    pub fn reset_edges(&self) {
        self.lock().image.reset_edges();
    }

    pub fn tilt_volts(&self) -> f32 {
        self.lock().tilt.volts()
    }

    pub fn rotate_angle(&self) -> f32 {
        self.lock().rotate.angle()
    }

    pub fn tilt_at_home(&self) -> bool {
        self.lock().tilt.at_home()
    }

    pub fn rotate_at_home(&self) -> bool {
        self.lock().rotate.at_home()
    }

    // ─── Perturbation ───────────────────────────────────────────────

    pub fn set_tilt_volts(&self, volts: f32) {
        self.lock().tilt.set_volts(volts);
    }

    pub fn set_rotate_angle(&self, deg: f32) {
        self.lock().rotate.set_angle(deg);
    }

    /// A stuck actuator ignores its relays.
    pub fn set_tilt_stuck(&self, stuck: bool) {
        self.lock().tilt.set_stuck(stuck);
    }

    pub fn set_rotate_stuck(&self, stuck: bool) {
        self.lock().rotate.set_stuck(stuck);
    }

    pub fn set_estop(&self, pressed: bool) {
        self.lock().estop = pressed;
    }

    /// Make every access to a point fail until cleared.
    pub fn inject_fault(&self, kind: PointKind, channel: u16) {
        self.lock().faults.insert((kind, channel));
    }

    pub fn clear_fault(&self, kind: PointKind, channel: u16) {
        self.lock().faults.remove(&(kind, channel));
    }

    /// Pin a digital input to a level regardless of physics. `None` releases it.
    pub fn force_input(&self, channel: u16, level: Option<bool>) {
        let mut s = self.lock();
        match level {
            Some(v) => s.forced_inputs.insert(channel, v),
            None => s.forced_inputs.remove(&channel),
        };
    }
}

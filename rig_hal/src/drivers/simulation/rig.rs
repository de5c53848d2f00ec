//! Simulated rig implementing [`IoDriver`].
//!
//! Physics are integrated lazily: every driver call first advances the
//! actuators from the last update to `clock.now_ms()` using the relay state
//! that was in force over that interval. Relay levels only change inside
//! driver calls, so the integration is exact for a piecewise-constant drive.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use rig_common::config::ChannelMap;
use rig_common::io::{IoDriver, IoError, PointKind};
use rig_common::time::Clock;
use tracing::{debug, trace};

use super::config::SimulationConfig;
use super::physics::{RotateMotor, TiltActuator};
use super::probe::SimProbe;
use super::process_image::{AI_COUNT, DI_COUNT, ProcessImage};

/// State shared between the driver and its probes.
#[derive(Debug)]
pub(crate) struct SimState {
    pub(crate) channels: ChannelMap,
    pub(crate) image: ProcessImage,
    pub(crate) tilt: TiltActuator,
    pub(crate) rotate: RotateMotor,
    pub(crate) last_update_ms: u64,
    pub(crate) estop: bool,
    pub(crate) faults: HashSet<(PointKind, u16)>,
    pub(crate) forced_inputs: HashMap<u16, bool>,
}

impl SimState {
    fn relay_on(&self, channel: u16) -> bool {
        self.image.relay(channel).unwrap_or(false)
    }

    pub(crate) fn integrate(&mut self, now_ms: u64) {
        let dt = now_ms.saturating_sub(self.last_update_ms);
        self.last_update_ms = self.last_update_ms.max(now_ms);
        if dt == 0 {
            return;
        }
        let ch = &self.channels;
        let tilt_on = self.relay_on(ch.ro_tilt_enable);
        let tilt_up = self.relay_on(ch.ro_tilt_dir);
        let rot_on = self.relay_on(ch.ro_rotate_enable);
        let rot_cw = self.relay_on(ch.ro_rotate_dir);
        self.tilt.advance(dt, tilt_on, tilt_up);
        self.rotate.advance(dt, rot_on, rot_cw);
    }

    fn check_fault(&self, kind: PointKind, channel: u16) -> Result<(), IoError> {
        if self.faults.contains(&(kind, channel)) {
            return Err(IoError::AccessFailed {
                kind,
                channel,
                reason: "injected fault".to_string(),
            });
        }
        Ok(())
    }

    /// Electrical level of a digital input, polarity included.
    fn digital_input(&self, channel: u16) -> Result<bool, IoError> {
        if channel == 0 || channel > DI_COUNT {
            return Err(IoError::InvalidChannel {
                kind: PointKind::DigitalIn,
                channel,
            });
        }
        if let Some(level) = self.forced_inputs.get(&channel) {
            return Ok(*level);
        }
        let ch = &self.channels;
        let level = if channel == ch.di_home_tilt {
            self.tilt.at_home() != ch.home_tilt_active_low
        } else if channel == ch.di_home_rotate {
            self.rotate.at_home() != ch.home_rotate_active_low
        } else if channel == ch.di_estop {
            self.estop != ch.estop_active_low
        } else {
            false
        };
        Ok(level)
    }
}

/// Process-image simulator of the tilt/rotate rig.
pub struct SimulatedRig {
    state: Arc<Mutex<SimState>>,
    clock: Arc<dyn Clock>,
}

impl SimulatedRig {
    pub fn new(config: &SimulationConfig, channels: ChannelMap, clock: Arc<dyn Clock>) -> Self {
        let state = SimState {
            channels,
            image: ProcessImage::new(),
            tilt: TiltActuator::new(config),
            rotate: RotateMotor::new(config),
            last_update_ms: clock.now_ms(),
            estop: false,
            faults: HashSet::new(),
            forced_inputs: HashMap::new(),
        };
        debug!(
            tilt_volts = state.tilt.volts(),
            rotate_deg = state.rotate.angle(),
            "Simulated rig created"
        );
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
        }
    }

    /// Handle for tests and the daemon to observe and perturb the rig.
    pub fn probe(&self) -> SimProbe {
        SimProbe::new(Arc::clone(&self.state), Arc::clone(&self.clock))
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimState>, IoError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| IoError::Unavailable("simulation state poisoned".to_string()))?;
        state.integrate(self.clock.now_ms());
        Ok(state)
    }
}

impl IoDriver for SimulatedRig {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn read_digital(&mut self, channel: u16) -> Result<bool, IoError> {
        let state = self.lock()?;
        state.check_fault(PointKind::DigitalIn, channel)?;
        state.digital_input(channel)
    }

    fn write_digital(&mut self, channel: u16, value: bool) -> Result<(), IoError> {
        let mut state = self.lock()?;
        state.check_fault(PointKind::DigitalOut, channel)?;
        let edge = state.image.write_relay(channel, value)?;

        if edge.falling() && channel == state.channels.ro_tilt_enable {
            let up = state.relay_on(state.channels.ro_tilt_dir);
            state.tilt.coast(up);
        }
        trace!(channel, value, relays = ?state.image.relays(), "RO write");
        Ok(())
    }

    fn read_analog(&mut self, channel: u16) -> Result<u16, IoError> {
        let state = self.lock()?;
        state.check_fault(PointKind::AnalogIn, channel)?;
        if channel == 0 || channel > AI_COUNT {
            return Err(IoError::InvalidChannel {
                kind: PointKind::AnalogIn,
                channel,
            });
        }
        if channel == state.channels.ai_tilt_position {
            Ok(state.tilt.adc())
        } else {
            Ok(0)
        }
    }

    fn write_analog(&mut self, channel: u16, value: u16) -> Result<(), IoError> {
        let mut state = self.lock()?;
        state.check_fault(PointKind::AnalogOut, channel)?;
        state.image.write_analog(channel, value)
    }
}

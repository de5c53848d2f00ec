//! Machine I/O layer.
//!
//! Turns the channel-addressed [`IoDriver`] into the handful of semantic
//! operations the axis controllers need: sensor reads with polarity applied,
//! a filtered tilt position, and relay pairs driven in a fixed order.

use std::sync::Arc;

use rig_common::config::ChannelMap;
use rig_common::consts::TILT_POSITION_SAMPLES;
use rig_common::io::{IoDriver, IoError};
use rig_common::time::Clock;
use tracing::{trace, warn};

/// Semantic access to the rig's sensors and relays.
pub struct RigIo {
    driver: Box<dyn IoDriver>,
    channels: ChannelMap,
    clock: Arc<dyn Clock>,
    sample_spacing_ms: u64,
}

impl RigIo {
    pub fn new(
        driver: Box<dyn IoDriver>,
        channels: ChannelMap,
        clock: Arc<dyn Clock>,
        sample_spacing_ms: u64,
    ) -> Self {
        Self {
            driver,
            channels,
            clock,
            sample_spacing_ms,
        }
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    // ─── Inputs ─────────────────────────────────────────────────────

    pub fn read_estop(&mut self) -> Result<bool, IoError> {
        let raw = self.driver.read_digital(self.channels.di_estop)?;
        Ok(raw != self.channels.estop_active_low)
    }

    pub fn read_home_tilt(&mut self) -> Result<bool, IoError> {
        let raw = self.driver.read_digital(self.channels.di_home_tilt)?;
        Ok(raw != self.channels.home_tilt_active_low)
    }

    /// Electrical level of the rotate home sensor, before polarity.
    pub fn read_home_rotate_raw(&mut self) -> Result<bool, IoError> {
        self.driver.read_digital(self.channels.di_home_rotate)
    }

    pub fn read_home_rotate(&mut self) -> Result<bool, IoError> {
        let raw = self.read_home_rotate_raw()?;
        Ok(self.interpret_home_rotate(raw))
    }

    /// Apply the configured polarity to a raw rotate home level.
    pub fn interpret_home_rotate(&self, raw: bool) -> bool {
        raw != self.channels.home_rotate_active_low
    }

    /// Single unfiltered tilt potentiometer sample, 0–10000 counts.
    pub fn read_tilt_adc(&mut self) -> Result<u16, IoError> {
        self.driver.read_analog(self.channels.ai_tilt_position)
    }

    /// Integer mean of three samples spaced `sample_spacing_ms` apart.
    ///
    /// Counts below ~950 are outside the actuator's usable range; callers
    /// decide what that means.
    pub fn read_tilt_position(&mut self) -> Result<u16, IoError> {
        let mut sum: u32 = 0;
        for i in 0..TILT_POSITION_SAMPLES {
            if i > 0 && self.sample_spacing_ms > 0 {
                self.clock.sleep(self.sample_spacing_ms);
            }
            sum += u32::from(self.read_tilt_adc()?);
        }
        Ok((sum / TILT_POSITION_SAMPLES) as u16)
    }

    // ─── Relays ─────────────────────────────────────────────────────

    /// Energize: direction then enable. De-energize: enable then direction.
    pub fn relay_tilt(&mut self, up: bool, on: bool) -> Result<(), IoError> {
        let (en, dir) = (self.channels.ro_tilt_enable, self.channels.ro_tilt_dir);
        self.relay_pair(en, dir, up, on)
    }

    /// Same ordering as [`relay_tilt`](Self::relay_tilt).
    pub fn relay_rotate(&mut self, cw: bool, on: bool) -> Result<(), IoError> {
        let (en, dir) = (self.channels.ro_rotate_enable, self.channels.ro_rotate_dir);
        self.relay_pair(en, dir, cw, on)
    }

    fn relay_pair(&mut self, enable: u16, dir: u16, forward: bool, on: bool) -> Result<(), IoError> {
        trace!(enable, dir, forward, on, "relay pair");
        if on {
            self.driver.write_digital(dir, forward)?;
            self.driver.write_digital(enable, true)
        } else {
            // Both writes are attempted even if the first fails.
            let en = self.driver.write_digital(enable, false);
            let dr = self.driver.write_digital(dir, false);
            if let Err(e) = &en {
                warn!(channel = enable, error = %e, "failed to drop enable relay");
            }
            en.and(dr)
        }
    }

    /// Drop every motion relay.
    pub fn all_off(&mut self) -> Result<(), IoError> {
        let tilt = self.relay_tilt(false, false);
        let rotate = self.relay_rotate(false, false);
        tilt.and(rotate)
    }
}

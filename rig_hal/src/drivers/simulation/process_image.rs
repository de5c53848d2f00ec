//! Simulated process image of the I/O module.
//!
//! The module packs its eight relay outputs into one byte. A relay write is
//! a read-modify-write of that byte, so switching one relay never disturbs
//! its neighbours.

use bitflags::bitflags;
use rig_common::consts::ADC_FULL_SCALE;
use rig_common::io::{IoError, PointKind};

/// Digital inputs on the module.
pub const DI_COUNT: u16 = 8;
/// Relay / digital outputs on the module.
pub const RO_COUNT: u16 = 8;
/// Analog inputs on the module.
pub const AI_COUNT: u16 = 4;
/// Analog outputs on the module.
pub const AO_COUNT: u16 = 4;

bitflags! {
    /// Relay output byte, bit `n` ⇔ relay `n + 1`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RelayImage: u8 {
        const RO1 = 0x01;
        const RO2 = 0x02;
        const RO3 = 0x04;
        const RO4 = 0x08;
        const RO5 = 0x10;
        const RO6 = 0x20;
        const RO7 = 0x40;
        const RO8 = 0x80;
    }
}

impl RelayImage {
    /// Bit for a 1-based relay channel.
    pub fn for_channel(channel: u16) -> Result<Self, IoError> {
        if channel == 0 || channel > RO_COUNT {
            return Err(IoError::InvalidChannel {
                kind: PointKind::DigitalOut,
                channel,
            });
        }
        Ok(Self::from_bits_retain(1 << (channel - 1)))
    }
}

/// Result of a relay write: the level before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayEdge {
    pub was: bool,
    pub now: bool,
}

impl RelayEdge {
    pub const fn rising(self) -> bool {
        !self.was && self.now
    }

    pub const fn falling(self) -> bool {
        self.was && !self.now
    }
}

/// Output side of the process image plus per-relay edge counters.
#[derive(Debug, Clone, Default)]
pub struct ProcessImage {
    relays: RelayImage,
    analog_out: [u16; AO_COUNT as usize],
    rises: [u32; RO_COUNT as usize],
    falls: [u32; RO_COUNT as usize],
}

impl ProcessImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relays(&self) -> RelayImage {
        self.relays
    }

    pub fn relay(&self, channel: u16) -> Result<bool, IoError> {
        Ok(self.relays.contains(RelayImage::for_channel(channel)?))
    }

    /// Read-modify-write of one relay bit.
    pub fn write_relay(&mut self, channel: u16, on: bool) -> Result<RelayEdge, IoError> {
        let bit = RelayImage::for_channel(channel)?;
        let mut image = self.relays;
        let was = image.contains(bit);
        image.set(bit, on);
        self.relays = image;

        let edge = RelayEdge { was, now: on };
        let idx = (channel - 1) as usize;
        if edge.rising() {
            self.rises[idx] += 1;
        } else if edge.falling() {
            self.falls[idx] += 1;
        }
        Ok(edge)
    }

    pub fn write_analog(&mut self, channel: u16, value: u16) -> Result<(), IoError> {
        if channel == 0 || channel > AO_COUNT {
            return Err(IoError::InvalidChannel {
                kind: PointKind::AnalogOut,
                channel,
            });
        }
        if value > ADC_FULL_SCALE {
            return Err(IoError::ValueOutOfRange {
                kind: PointKind::AnalogOut,
                channel,
                value,
            });
        }
        self.analog_out[(channel - 1) as usize] = value;
        Ok(())
    }

    pub fn analog_out(&self, channel: u16) -> Option<u16> {
        self.analog_out.get(channel.checked_sub(1)? as usize).copied()
    }

    /// `(rising, falling)` edge counts for a relay.
    pub fn edges(&self, channel: u16) -> (u32, u32) {
        match channel.checked_sub(1).map(usize::from) {
            Some(idx) if idx < RO_COUNT as usize => (self.rises[idx], self.falls[idx]),
            _ => (0, 0),
        }
    }

    pub fn reset_edges(&mut self) {
        self.rises = [0; RO_COUNT as usize];
        self.falls = [0; RO_COUNT as usize];
    }
}

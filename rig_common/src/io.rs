//! I/O driver contract.
//!
//! The rig is wired to an industrial I/O module that exposes discrete
//! inputs, relay/discrete outputs and 0–10 V analog channels as numbered
//! points. Everything above this trait addresses hardware by channel
//! number only; drivers translate that to the bus.
//!
//! Analog values are raw counts, `0..=ADC_FULL_SCALE` ⇔ 0–10 V.

use thiserror::Error;

/// Kind of I/O point, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointKind {
    DigitalIn,
    DigitalOut,
    AnalogIn,
    AnalogOut,
}

impl std::fmt::Display for PointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DigitalIn => "DI",
            Self::DigitalOut => "DO",
            Self::AnalogIn => "AI",
            Self::AnalogOut => "AO",
        };
        f.write_str(s)
    }
}

/// Error type for driver operations. Drivers return these, never panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// Channel number not present on this module.
    #[error("{kind}{channel} does not exist")]
    InvalidChannel { kind: PointKind, channel: u16 },

    /// Bus/transport failure while accessing a point.
    #[error("{kind}{channel} access failed: {reason}")]
    AccessFailed {
        kind: PointKind,
        channel: u16,
        reason: String,
    },

    /// Analog value outside the module's range.
    #[error("{kind}{channel} value {value} out of range")]
    ValueOutOfRange {
        kind: PointKind,
        channel: u16,
        value: u16,
    },

    /// Driver not connected / already shut down.
    #[error("I/O driver unavailable: {0}")]
    Unavailable(String),
}

/// Interface for pluggable I/O backends (simulation, fieldbus, ...).
///
/// All calls are expected to complete promptly; the control loop issues a
/// handful per tick and never retries on its own.
pub trait IoDriver: Send {
    /// Driver identifier, e.g. `"simulation"`.
    fn name(&self) -> &'static str;

    fn read_digital(&mut self, channel: u16) -> Result<bool, IoError>;

    /// Relay outputs are addressed as digital outputs.
    fn write_digital(&mut self, channel: u16, value: bool) -> Result<(), IoError>;

    fn read_analog(&mut self, channel: u16) -> Result<u16, IoError>;

    fn write_analog(&mut self, channel: u16, value: u16) -> Result<(), IoError>;
}

impl<D: IoDriver + ?Sized> IoDriver for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read_digital(&mut self, channel: u16) -> Result<bool, IoError> {
        (**self).read_digital(channel)
    }

    fn write_digital(&mut self, channel: u16, value: bool) -> Result<(), IoError> {
        (**self).write_digital(channel, value)
    }

    fn read_analog(&mut self, channel: u16) -> Result<u16, IoError> {
        (**self).read_analog(channel)
    }

    fn write_analog(&mut self, channel: u16, value: u16) -> Result<(), IoError> {
        (**self).write_analog(channel, value)
    }
}

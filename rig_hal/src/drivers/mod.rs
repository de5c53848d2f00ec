//! I/O driver implementations.
//!
//! - [`simulation`] - Software model of the rig for development and testing
//!
//! The fieldbus driver for the physical I/O module is not part of this
//! crate; [`create_driver`] reports it as unavailable.

pub mod simulation;

use std::sync::Arc;

use rig_common::config::ChannelMap;
use rig_common::io::{IoDriver, IoError};
use rig_common::time::Clock;

use simulation::SimulationConfig;

/// Names accepted by [`create_driver`].
pub const DRIVER_NAMES: &[&str] = &["simulation"];

/// Create a driver instance by name.
///
/// # Errors
/// `IoError::Unavailable` if no driver with the given name is built in.
pub fn create_driver(
    name: &str,
    sim: &SimulationConfig,
    channels: ChannelMap,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn IoDriver>, IoError> {
    match name {
        "simulation" => Ok(simulation::create_driver(sim, channels, clock)),
        other => Err(IoError::Unavailable(format!(
            "driver '{other}' not built in (available: {})",
            DRIVER_NAMES.join(", ")
        ))),
    }
}

//! Simulation driver module.
//!
//! Software model of the rig (relay byte, home sensors, tilt potentiometer,
//! turntable motor) for development and testing without the I/O module.

mod config;
mod physics;
mod probe;
mod process_image;
mod rig;

pub use config::SimulationConfig;
pub use physics::{RotateMotor, TiltActuator};
pub use probe::SimProbe;
pub use process_image::{ProcessImage, RelayEdge, RelayImage};
pub use rig::SimulatedRig;

use std::sync::Arc;

use rig_common::config::ChannelMap;
use rig_common::io::IoDriver;
use rig_common::time::Clock;

/// Factory function to create a simulation driver instance.
pub fn create_driver(
    config: &SimulationConfig,
    channels: ChannelMap,
    clock: Arc<dyn Clock>,
) -> Box<dyn IoDriver> {
    Box::new(SimulatedRig::new(config, channels, clock))
}

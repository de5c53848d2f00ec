//! Rig HAL
//!
//! I/O drivers implementing [`rig_common::io::IoDriver`] for the
//! tilt/rotate rig.

pub mod drivers;

pub use drivers::create_driver;
pub use drivers::simulation::{SimProbe, SimulatedRig, SimulationConfig};

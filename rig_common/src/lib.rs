//! Rig Common Library
//!
//! Shared value types and contracts for the tilt/rotate rig workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - I/O scaling, default wiring and supervision limits
//! - [`control`] - Status/phase enums, calibration and session value objects
//! - [`io`] - The `IoDriver` contract implemented by HAL drivers
//! - [`time`] - Millisecond clock abstraction and the service rate limiter
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rig_common::prelude::*;
//!
//! let cal = TiltCalibration::default();
//! assert!(cal.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod io;
pub mod prelude;
pub mod time;

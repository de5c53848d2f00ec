//! Configuration loading traits and types.
//!
//! Every rig binary reads one TOML file. The pieces shared by all of them
//! (logging, control-loop timing, channel wiring) live here; the daemon
//! composes them into its own top-level struct.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rig_common::config::{ConfigLoader, SharedConfig, ConfigError};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct MyAppConfig {
//!     shared: SharedConfig,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MyAppConfig::load(Path::new("rig.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::consts::{
    AI_TILT_POSITION, DEFAULT_CALIBRATION_PATH, DEFAULT_SAMPLE_SPACING_MS,
    DEFAULT_TICK_INTERVAL_MS, DI_ESTOP, DI_HOME_ROTATE, DI_HOME_TILT, RO_ROTATE_DIR,
    RO_ROTATE_ENABLE, RO_TILT_DIR, RO_TILT_ENABLE,
};

/// Error type for configuration loading and validation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across rig applications.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "rig-cell-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier used in log output.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "rig".to_string(),
        }
    }
}

impl SharedConfig {
    /// # Errors
    ///
    /// `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Control-loop timing and persistence settings.
///
/// ```toml
/// [control]
/// tick_interval_ms = 100
/// calibration_path = "/etc/rig/calibration.json"
/// sample_spacing_ms = 1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Orchestrator tick period [ms].
    pub tick_interval_ms: u64,
    /// Where tilt/rotate calibration is persisted.
    pub calibration_path: PathBuf,
    /// Spacing between the samples of one averaged tilt read [ms].
    pub sample_spacing_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            calibration_path: PathBuf::from(DEFAULT_CALIBRATION_PATH),
            sample_spacing_ms: DEFAULT_SAMPLE_SPACING_MS,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "control.tick_interval_ms must be > 0".to_string(),
            ));
        }
        if self.calibration_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "control.calibration_path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Physical channel assignment (1-based, as printed on the I/O module).
///
/// Home sensors and the ESTOP input may be wired active-low; the polarity
/// flags are applied before any controller sees the value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelMap {
    pub di_home_rotate: u16,
    pub di_home_tilt: u16,
    pub di_estop: u16,
    pub ai_tilt_position: u16,
    pub ro_rotate_enable: u16,
    pub ro_rotate_dir: u16,
    pub ro_tilt_enable: u16,
    pub ro_tilt_dir: u16,
    pub home_rotate_active_low: bool,
    pub home_tilt_active_low: bool,
    pub estop_active_low: bool,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            di_home_rotate: DI_HOME_ROTATE,
            di_home_tilt: DI_HOME_TILT,
            di_estop: DI_ESTOP,
            ai_tilt_position: AI_TILT_POSITION,
            ro_rotate_enable: RO_ROTATE_ENABLE,
            ro_rotate_dir: RO_ROTATE_DIR,
            ro_tilt_enable: RO_TILT_ENABLE,
            ro_tilt_dir: RO_TILT_DIR,
            home_rotate_active_low: false,
            home_tilt_active_low: false,
            estop_active_low: false,
        }
    }
}

impl ChannelMap {
    /// Rejects zero channels and relay outputs assigned twice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("di_home_rotate", self.di_home_rotate),
            ("di_home_tilt", self.di_home_tilt),
            ("di_estop", self.di_estop),
            ("ai_tilt_position", self.ai_tilt_position),
            ("ro_rotate_enable", self.ro_rotate_enable),
            ("ro_rotate_dir", self.ro_rotate_dir),
            ("ro_tilt_enable", self.ro_tilt_enable),
            ("ro_tilt_dir", self.ro_tilt_dir),
        ];
        if let Some((name, _)) = named.iter().find(|(_, ch)| *ch == 0) {
            return Err(ConfigError::ValidationError(format!(
                "channels.{name} must be >= 1"
            )));
        }

        let relays = &named[4..];
        for (i, (a_name, a)) in relays.iter().enumerate() {
            if let Some((b_name, _)) = relays[i + 1..].iter().find(|(_, b)| b == a) {
                return Err(ConfigError::ValidationError(format!(
                    "channels.{a_name} and channels.{b_name} share relay {a}"
                )));
            }
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// - `ConfigError::FileNotFound` if the file does not exist
/// - `ConfigError::ParseError` if TOML syntax or shape is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

//! Daemon configuration.
//!
//! One TOML file composed from the shared sections plus the driver choice:
//!
//! ```toml
//! driver = "simulation"
//!
//! [shared]
//! service_name = "rig"
//! log_level = "info"
//!
//! [control]
//! tick_interval_ms = 100
//! calibration_path = "/etc/rig/calibration.json"
//!
//! [channels]
//! di_estop = 4
//!
//! [simulation]
//! rpm = 1.0
//! ```

use std::path::Path;

use rig_common::config::{ChannelMap, ConfigError, ConfigLoader, ControlConfig, SharedConfig};
use rig_hal::SimulationConfig;
use rig_hal::drivers::DRIVER_NAMES;
use serde::{Deserialize, Serialize};

fn default_driver() -> String {
    "simulation".to_string()
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// I/O driver name, see [`DRIVER_NAMES`].
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub channels: ChannelMap,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            shared: SharedConfig::default(),
            control: ControlConfig::default(),
            channels: ChannelMap::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl RigConfig {
    /// Load and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !DRIVER_NAMES.contains(&self.driver.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown driver '{}' (available: {})",
                self.driver,
                DRIVER_NAMES.join(", ")
            )));
        }
        self.shared.validate()?;
        self.control.validate()?;
        self.channels.validate()?;
        self.simulation
            .validate()
            .map_err(ConfigError::ValidationError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(text: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let f = write_toml("");
        let config = RigConfig::load_validated(f.path()).unwrap();
        assert_eq!(config.driver, "simulation");
        assert_eq!(config.control.tick_interval_ms, 100);
        assert_eq!(config.channels.di_estop, 4);
    }

    #[test]
    fn sections_override_defaults() {
        let f = write_toml(
            r#"
            [control]
            tick_interval_ms = 50

            [channels]
            estop_active_low = true

            [simulation]
            rpm = 2.0
            "#,
        );
        let config = RigConfig::load_validated(f.path()).unwrap();
        assert_eq!(config.control.tick_interval_ms, 50);
        assert!(config.channels.estop_active_low);
        assert_eq!(config.simulation.rpm, 2.0);
    }

    #[test]
    fn rejects_unknown_driver() {
        let f = write_toml("driver = \"revpi\"\n");
        assert!(matches!(
            RigConfig::load_validated(f.path()),
            Err(ConfigError::ValidationError(msg)) if msg.contains("revpi")
        ));
    }

    #[test]
    fn rejects_bad_simulation_values() {
        let f = write_toml("[simulation]\nrpm = 0.0\n");
        assert!(matches!(
            RigConfig::load_validated(f.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            RigConfig::load_validated(Path::new("/nonexistent/rig.toml")),
            Err(ConfigError::FileNotFound)
        ));
    }
}

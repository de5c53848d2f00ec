//! Calibration store.
//!
//! Calibration is measured on the bench and persisted as JSON, one section
//! per axis:
//!
//! ```json
//! {
//!   "tilt":   { "is_calibrated": true, "calibration_date": "2025-03-14", "minimum_volts": 0.29, ... },
//!   "rotate": { "is_calibrated": true, "calibration_date": "2025-03-14", "rpm": 1.0, ... }
//! }
//! ```
//!
//! Values are validated before they are handed out.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rig_common::config::ConfigError;
use rig_common::control::{Axis, RotateCalibration, TiltCalibration};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("calibration file not found: {0}")]
    NotFound(PathBuf),

    #[error("calibration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed calibration data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} axis is not calibrated")]
    NotCalibrated(Axis),

    #[error("invalid calibration: {0}")]
    Invalid(#[from] ConfigError),
}

/// Source of per-axis calibration.
pub trait CalibrationStore: Send {
    fn load_tilt_calibration(&self) -> Result<TiltCalibration, CalibrationError>;
    fn load_rotate_calibration(&self) -> Result<RotateCalibration, CalibrationError>;
}

// ─── JSON File ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Section<T> {
    #[serde(default)]
    is_calibrated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calibration_date: Option<String>,
    #[serde(flatten)]
    values: T,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CalibrationFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tilt: Option<Section<TiltCalibration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rotate: Option<Section<RotateCalibration>>,
}

/// `calibration.json` on disk.
#[derive(Debug, Clone)]
pub struct JsonCalibrationStore {
    path: PathBuf,
}

impl JsonCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<CalibrationFile, CalibrationError> {
        if !self.path.exists() {
            return Err(CalibrationError::NotFound(self.path.clone()));
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn read_or_default(&self) -> Result<CalibrationFile, CalibrationError> {
        match self.read() {
            Err(CalibrationError::NotFound(_)) => Ok(CalibrationFile::default()),
            other => other,
        }
    }

    fn write(&self, file: &CalibrationFile) -> Result<(), CalibrationError> {
        let text = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    /// Persist tilt calibration, keeping the rotate section.
    pub fn save_tilt_calibration(
        &self,
        cal: &TiltCalibration,
        date: Option<&str>,
    ) -> Result<(), CalibrationError> {
        cal.validate()?;
        let mut file = self.read_or_default()?;
        file.tilt = Some(Section {
            is_calibrated: true,
            calibration_date: date.map(str::to_owned),
            values: *cal,
        });
        self.write(&file)?;
        info!(path = %self.path.display(), "Tilt calibration saved");
        Ok(())
    }

    /// Persist rotate calibration, keeping the tilt section.
    pub fn save_rotate_calibration(
        &self,
        cal: &RotateCalibration,
        date: Option<&str>,
    ) -> Result<(), CalibrationError> {
        cal.validate()?;
        let mut file = self.read_or_default()?;
        file.rotate = Some(Section {
            is_calibrated: true,
            calibration_date: date.map(str::to_owned),
            values: *cal,
        });
        self.write(&file)?;
        info!(path = %self.path.display(), "Rotate calibration saved");
        Ok(())
    }
}

fn accept<T>(axis: Axis, section: Option<Section<T>>) -> Result<T, CalibrationError> {
    match section {
        Some(s) if s.is_calibrated => {
            debug!(%axis, date = s.calibration_date.as_deref().unwrap_or("-"), "calibration loaded");
            Ok(s.values)
        }
        _ => Err(CalibrationError::NotCalibrated(axis)),
    }
}

impl CalibrationStore for JsonCalibrationStore {
    fn load_tilt_calibration(&self) -> Result<TiltCalibration, CalibrationError> {
        let cal = accept(Axis::Tilt, self.read()?.tilt)?;
        cal.validate()?;
        Ok(cal)
    }

    fn load_rotate_calibration(&self) -> Result<RotateCalibration, CalibrationError> {
        let cal = accept(Axis::Rotate, self.read()?.rotate)?;
        cal.validate()?;
        Ok(cal)
    }
}

// ─── In Memory ──────────────────────────────────────────────────────

/// Store backed by plain values. Used by the simulation daemon and tests.
#[derive(Debug, Default)]
pub struct MemoryCalibrationStore {
    tilt: Option<TiltCalibration>,
    rotate: Option<RotateCalibration>,
    loads: Mutex<HashMap<Axis, u32>>,
}

impl MemoryCalibrationStore {
    pub fn new(tilt: Option<TiltCalibration>, rotate: Option<RotateCalibration>) -> Self {
        Self {
            tilt,
            rotate,
            loads: Mutex::new(HashMap::new()),
        }
    }

    /// Both axes at their default calibration.
    pub fn calibrated() -> Self {
        Self::new(Some(TiltCalibration::default()), Some(RotateCalibration::default()))
    }

    /// How many times an axis was loaded.
    pub fn load_count(&self, axis: Axis) -> u32 {
        self.loads
            .lock()
            .map(|m| m.get(&axis).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn load<T: Copy>(&self, axis: Axis, value: Option<T>) -> Result<T, CalibrationError> {
        if let Ok(mut m) = self.loads.lock() {
            *m.entry(axis).or_default() += 1;
        }
        value.ok_or(CalibrationError::NotCalibrated(axis))
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load_tilt_calibration(&self) -> Result<TiltCalibration, CalibrationError> {
        let cal = self.load(Axis::Tilt, self.tilt)?;
        cal.validate()?;
        Ok(cal)
    }

    fn load_rotate_calibration(&self) -> Result<RotateCalibration, CalibrationError> {
        let cal = self.load(Axis::Rotate, self.rotate)?;
        cal.validate()?;
        Ok(cal)
    }
}

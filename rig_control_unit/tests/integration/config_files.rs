//! Shipped configuration and calibration files.

use std::path::Path;

use rig_common::control::Axis;
use rig_control_unit::calibration::{CalibrationError, CalibrationStore, JsonCalibrationStore};
use rig_control_unit::RigConfig;

fn shipped(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config").join(name)
}

#[test]
fn test_shipped_rig_toml_matches_defaults() {
    let config = RigConfig::load_validated(&shipped("rig.toml")).unwrap();
    let defaults = RigConfig::default();
    assert_eq!(config.channels, defaults.channels);
    assert_eq!(config.simulation, defaults.simulation);
    assert_eq!(config.control.tick_interval_ms, defaults.control.tick_interval_ms);
    assert_eq!(config.driver, "simulation");
}

#[test]
fn test_shipped_calibration_json() {
    let store = JsonCalibrationStore::new(shipped("calibration.json"));
    let tilt = store.load_tilt_calibration().unwrap();
    assert!((tilt.tilt_to_volt(30.0) - 3.594).abs() < 1e-3);
    assert_eq!(store.load_rotate_calibration().unwrap().rpm, 1.0);
}

#[test]
fn test_calibration_roundtrip_through_orchestrator_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonCalibrationStore::new(dir.path().join("calibration.json"));
    assert!(matches!(
        store.load_tilt_calibration(),
        Err(CalibrationError::NotFound(_))
    ));
    store
        .save_rotate_calibration(&Default::default(), Some("2025-06-01"))
        .unwrap();
    assert!(matches!(
        store.load_tilt_calibration(),
        Err(CalibrationError::NotCalibrated(Axis::Tilt))
    ));
    assert!(store.load_rotate_calibration().is_ok());
}

//! Homing sequences.

use rig_common::control::{Axis, AxisState, ControlPhase, MachineStatus};
use rig_common::io::PointKind;
use rig_common::time::Clock;
use rig_control_unit::{AxisFault, ControlError};
use rig_hal::SimulationConfig;

use super::Rig;

#[test]
fn test_home_from_arbitrary_position() {
    let sim = SimulationConfig {
        initial_tilt_volts: 7.5,
        initial_rotate_deg: 10.0,
        ..SimulationConfig::default()
    };
    let mut rig = Rig::new(sim);
    rig.orch.begin_home().unwrap();
    assert_eq!(rig.orch.shared().tilt_state(), AxisState::RunningTilt);
    assert_eq!(rig.orch.shared().rotate_state(), AxisState::Idle);

    while rig.orch.phase() == ControlPhase::HomeTilt {
        rig.step();
    }
    assert_eq!(rig.orch.shared().tilt_state(), AxisState::Idle);
    assert_eq!(rig.orch.shared().rotate_state(), AxisState::RunningRotate);

    assert_eq!(rig.settle(), MachineStatus::Ready);
    assert_eq!(rig.probe.tilt_enable_edges(), (1, 1));
    assert_eq!(rig.probe.rotate_enable_edges(), (1, 1));
    assert!(rig.orch.check_home().is_ok());
}

#[test]
fn test_home_when_only_tilt_is_home() {
    let sim = SimulationConfig {
        initial_rotate_deg: 300.0,
        ..SimulationConfig::homed()
    };
    let mut rig = Rig::new(sim);
    rig.orch.begin_home().unwrap();
    assert_eq!(rig.orch.phase(), ControlPhase::HomeRotate);
    assert_eq!(rig.settle(), MachineStatus::Ready);
    assert_eq!(rig.probe.tilt_enable_edges(), (0, 0));
    // 58 degrees at 6 deg/s
    assert!(rig.clock.now_ms() < 11_000);
}

#[test]
fn test_home_rotate_timeout() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.probe.set_rotate_angle(180.0);
    rig.probe.set_rotate_stuck(true);
    let err = rig.orch.home().unwrap_err();
    assert!(matches!(
        err,
        ControlError::Axis {
            axis: Axis::Rotate,
            fault: AxisFault::Timeout { .. }
        }
    ));
    assert_eq!(rig.orch.status(), MachineStatus::Fault);
    assert!(rig.probe.relays().is_empty());
}

#[test]
fn test_home_tilt_stall() {
    let mut rig = Rig::new(SimulationConfig::default());
    rig.probe.set_tilt_stuck(true);
    let err = rig.orch.home().unwrap_err();
    assert!(matches!(
        err,
        ControlError::Axis {
            axis: Axis::Tilt,
            fault: AxisFault::Stall { .. }
        }
    ));
    assert_eq!(rig.probe.rotate_enable_edges(), (0, 0));
}

#[test]
fn test_pause_and_resume_homing() {
    let mut rig = Rig::new(SimulationConfig::default());
    rig.orch.begin_home().unwrap();
    rig.steps(10);
    rig.orch.pause_session().unwrap();
    assert_eq!(rig.orch.phase(), ControlPhase::HomeTilt);
    assert!(rig.probe.relays().is_empty());

    rig.orch.resume_session().unwrap();
    assert!(rig.probe.tilt_energized());
    assert_eq!(rig.settle(), MachineStatus::Ready);
}

#[test]
fn test_home_sensor_fault() {
    let mut rig = Rig::new(SimulationConfig::default());
    rig.probe.inject_fault(PointKind::DigitalIn, 2);
    assert!(rig.orch.begin_home().is_err());
    assert_eq!(rig.orch.status(), MachineStatus::Fault);
    assert_eq!(rig.probe.tilt_enable_edges(), (0, 0));
}

#[test]
fn test_active_low_home_sensors() {
    use rig_common::config::ChannelMap;
    use rig_common::time::ManualClock;
    use rig_control_unit::{MemoryCalibrationStore, RigIo, SessionOrchestrator};
    use rig_hal::SimulatedRig;
    use std::sync::Arc;

    let channels = ChannelMap {
        home_rotate_active_low: true,
        home_tilt_active_low: true,
        estop_active_low: true,
        ..ChannelMap::default()
    };
    let clock = ManualClock::new();
    let driver = SimulatedRig::new(
        &SimulationConfig::default(),
        channels.clone(),
        Arc::new(clock.clone()),
    );
    let io = RigIo::new(Box::new(driver), channels, Arc::new(clock.clone()), 1);
    let mut orch = SessionOrchestrator::new(io, Box::new(MemoryCalibrationStore::calibrated()), 100);
    orch.init();
    orch.calibrate_tilt().unwrap();
    orch.calibrate_rotate().unwrap();
    assert!(!orch.poll_estop_input().unwrap());

    orch.home().unwrap();
    assert!(clock.now_ms() > 0);
    assert_eq!(orch.status(), MachineStatus::Ready);
}

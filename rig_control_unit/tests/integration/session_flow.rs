//! Full home → session → done workflows.

use rig_common::control::{ControlPhase, MachineStatus, RotateDirection, SessionConfig};
use rig_common::time::Clock;
use rig_hal::SimulationConfig;

use super::Rig;

#[test]
fn test_end_to_end_session() {
    let mut rig = Rig::new(SimulationConfig::default());
    rig.orch.home().unwrap();
    assert_eq!(rig.orch.status(), MachineStatus::Ready);
    assert!(rig.probe.tilt_at_home());
    assert!(rig.probe.rotate_at_home());

    rig.probe.reset_edges();
    rig.orch
        .start_session(SessionConfig::new(30, RotateDirection::Cw, 180))
        .unwrap();
    assert_eq!(rig.orch.phase(), ControlPhase::Tilt);

    let mut rotate_started = None;
    while rig.orch.status() == MachineStatus::Running {
        rig.step();
        if rotate_started.is_none() && rig.orch.phase() == ControlPhase::Rotate {
            rotate_started = Some(rig.clock.now_ms());
        }
    }
    assert_eq!(rig.orch.status(), MachineStatus::Done);
    assert_eq!(rig.orch.phase(), ControlPhase::Done);

    assert_eq!(rig.probe.tilt_enable_edges(), (1, 1));
    assert_eq!(rig.probe.rotate_enable_edges(), (1, 1));
    assert!(rig.probe.relays().is_empty());

    let rotate_ms = rig.clock.now_ms() - rotate_started.unwrap();
    assert!(
        (29_900..=30_200).contains(&rotate_ms),
        "rotate phase took {rotate_ms} ms"
    );
    assert_eq!(rig.orch.rotate().read_position(), 180);

    let volts = rig.probe.tilt_volts();
    assert!((volts - 3.594).abs() < 0.05, "tilt landed at {volts} V");
    let angle = rig.probe.rotate_angle();
    assert!((angle - 178.0).abs() < 3.0, "table at {angle} deg");
}

#[test]
fn test_session_from_home_sensors() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(45, RotateDirection::Ccw, 90))
        .unwrap();
    assert_eq!(rig.settle(), MachineStatus::Done);
    assert_eq!(rig.orch.rotate().read_position(), 270);
    assert!(rig.orch.session().is_none());
}

#[test]
fn test_second_session_needs_rehome() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(20, RotateDirection::Cw, 90))
        .unwrap();
    assert_eq!(rig.settle(), MachineStatus::Done);

    // axes are away from their sensors now
    assert!(rig
        .orch
        .start_session(SessionConfig::new(20, RotateDirection::Cw, 90))
        .is_err());
    assert_eq!(rig.orch.status(), MachineStatus::Fault);

    rig.orch.init();
    rig.orch.begin_home().unwrap();
    assert_eq!(rig.settle(), MachineStatus::Ready);
    rig.orch
        .start_session(SessionConfig::new(20, RotateDirection::Cw, 90))
        .unwrap();
    assert_eq!(rig.settle(), MachineStatus::Done);
}

#[test]
fn test_rotate_only_session() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(0, RotateDirection::Cw, 60))
        .unwrap();
    assert_eq!(rig.orch.phase(), ControlPhase::Rotate);
    assert_eq!(rig.settle(), MachineStatus::Done);
    assert_eq!(rig.probe.tilt_enable_edges(), (0, 0));
    assert_eq!(rig.probe.rotate_enable_edges(), (1, 1));
}

#[test]
fn test_pause_resume_during_tilt() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(50, RotateDirection::Cw, 30))
        .unwrap();
    rig.steps(20);
    assert_eq!(rig.orch.phase(), ControlPhase::Tilt);

    rig.orch.pause_session().unwrap();
    assert!(rig.probe.relays().is_empty());
    let parked = rig.probe.tilt_volts();
    rig.steps(50);
    assert_eq!(rig.orch.status(), MachineStatus::Paused);
    assert_eq!(rig.probe.tilt_volts(), parked);

    rig.orch.resume_session().unwrap();
    assert_eq!(rig.orch.status(), MachineStatus::Running);
    assert_eq!(rig.settle(), MachineStatus::Done);

    let target = rig.orch.tilt().tilt_to_volt(50.0);
    let volts = rig.probe.tilt_volts();
    assert!((volts - target).abs() < 0.06, "landed {volts}, wanted {target}");
}

#[test]
fn test_pause_resume_during_rotate_keeps_total() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(0, RotateDirection::Cw, 120))
        .unwrap();
    rig.steps(50);
    rig.orch.pause_session().unwrap();
    assert!(!rig.probe.rotate_energized());
    assert!(rig.orch.rotate().remaining_degrees().is_some());

    rig.steps(30);
    rig.orch.resume_session().unwrap();
    assert_eq!(rig.settle(), MachineStatus::Done);
    assert_eq!(rig.orch.rotate().read_position(), 120);
    let angle = rig.probe.rotate_angle();
    assert!((angle - 120.0).abs() < 2.0, "table at {angle}");
}

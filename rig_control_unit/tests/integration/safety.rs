//! ESTOP, stop and fault handling across phases.

use rig_common::control::{Axis, ControlPhase, MachineStatus, RotateDirection, SessionConfig};
use rig_common::io::PointKind;
use rig_control_unit::{AxisFault, ControlError};
use rig_hal::SimulationConfig;

use super::Rig;

#[test]
fn test_estop_input_during_each_phase() {
    let phases = [
        ControlPhase::HomeTilt,
        ControlPhase::HomeRotate,
        ControlPhase::Tilt,
        ControlPhase::Rotate,
    ];
    for phase in phases {
        let mut rig = match phase {
            ControlPhase::HomeTilt | ControlPhase::HomeRotate => {
                let mut rig = Rig::new(SimulationConfig::default());
                rig.orch.begin_home().unwrap();
                rig
            }
            _ => {
                let mut rig = Rig::new(SimulationConfig::homed());
                rig.orch
                    .start_session(SessionConfig::new(30, RotateDirection::Cw, 90))
                    .unwrap();
                rig
            }
        };
        while rig.orch.phase() != phase {
            assert_eq!(rig.step(), MachineStatus::Running, "never reached {phase:?}");
        }

        rig.probe.set_estop(true);
        assert_eq!(rig.step(), MachineStatus::EStop, "{phase:?}");
        assert!(rig.probe.relays().is_empty(), "{phase:?}");

        rig.probe.set_estop(false);
        rig.steps(10);
        assert_eq!(rig.orch.status(), MachineStatus::EStop, "{phase:?}");
        assert!(rig.probe.relays().is_empty(), "{phase:?}");

        rig.orch.init();
        assert_eq!(rig.step(), MachineStatus::Ready);
    }
}

#[test]
fn test_estop_overrides_paused_and_done() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(30, RotateDirection::Cw, 90))
        .unwrap();
    rig.steps(5);
    rig.orch.pause_session().unwrap();
    rig.orch.notify_estop_active();
    assert_eq!(rig.orch.tick(), MachineStatus::EStop);
    assert!(matches!(rig.orch.resume_session(), Err(ControlError::EStop)));

    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(0, RotateDirection::Cw, 0))
        .unwrap();
    assert_eq!(rig.orch.status(), MachineStatus::Done);
    rig.orch.notify_estop_active();
    assert_eq!(rig.orch.tick(), MachineStatus::EStop);
}

#[test]
fn test_estop_from_other_thread() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(30, RotateDirection::Cw, 90))
        .unwrap();
    let shared = rig.orch.shared();
    std::thread::spawn(move || shared.latch_estop())
        .join()
        .unwrap();
    assert_eq!(rig.step(), MachineStatus::EStop);
    assert!(rig.probe.relays().is_empty());
}

#[test]
fn test_stop_twice_from_rotate() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(0, RotateDirection::Ccw, 180))
        .unwrap();
    rig.steps(10);
    assert!(rig.probe.rotate_energized());

    rig.orch.stop_session();
    assert!(rig.probe.relays().is_empty());
    assert_eq!(rig.orch.rotate().remaining_degrees(), None);
    rig.orch.stop_session();
    assert_eq!(rig.orch.status(), MachineStatus::Fault);
    assert_eq!(rig.orch.phase(), ControlPhase::Idle);
    assert!(rig.orch.resume_session().is_err());
}

#[test]
fn test_adc_loss_mid_tilt_faults() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.orch
        .start_session(SessionConfig::new(30, RotateDirection::Cw, 90))
        .unwrap();
    rig.steps(5);
    rig.probe.inject_fault(PointKind::AnalogIn, 1);
    assert_eq!(rig.step(), MachineStatus::Fault);
    assert_eq!(rig.orch.phase(), ControlPhase::Idle);
    assert!(matches!(
        rig.orch.last_fault(),
        Some((Axis::Tilt, AxisFault::Io(_)))
    ));
    assert!(rig.probe.relays().is_empty());
}

#[test]
fn test_relay_fault_at_start_leaves_outputs_off() {
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.probe.inject_fault(PointKind::DigitalOut, 3);
    assert!(rig
        .orch
        .start_session(SessionConfig::new(30, RotateDirection::Cw, 90))
        .is_err());
    assert_eq!(rig.orch.status(), MachineStatus::Fault);
    assert!(!rig.probe.tilt_energized());
}

#[test]
fn test_stuck_rotate_times_out_on_duration_only() {
    // dead reckoning cannot see a jammed table
    let mut rig = Rig::new(SimulationConfig::homed());
    rig.probe.set_rotate_stuck(true);
    rig.orch
        .start_session(SessionConfig::new(0, RotateDirection::Cw, 90))
        .unwrap();
    assert_eq!(rig.settle(), MachineStatus::Done);
    assert_eq!(rig.orch.rotate().read_position(), 90);
    assert!(rig.probe.rotate_angle() < 1.0);
}

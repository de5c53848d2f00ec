mod config_files;
mod homing;
mod safety;
mod session_flow;

use std::sync::Arc;

use rig_common::config::ChannelMap;
use rig_common::control::MachineStatus;
use rig_common::time::ManualClock;
use rig_control_unit::{MemoryCalibrationStore, RigIo, SessionOrchestrator};
use rig_hal::{SimProbe, SimulatedRig, SimulationConfig};

// ── Helpers ──

pub struct Rig {
    pub orch: SessionOrchestrator,
    pub probe: SimProbe,
    pub clock: ManualClock,
}

impl Rig {
    /// Initialized and calibrated, not homed.
    pub fn new(sim: SimulationConfig) -> Self {
        let clock = ManualClock::new();
        let driver = SimulatedRig::new(&sim, ChannelMap::default(), Arc::new(clock.clone()));
        let probe = driver.probe();
        let io = RigIo::new(Box::new(driver), ChannelMap::default(), Arc::new(clock.clone()), 1);
        let mut orch =
            SessionOrchestrator::new(io, Box::new(MemoryCalibrationStore::calibrated()), 100);
        orch.init();
        orch.calibrate_tilt().unwrap();
        orch.calibrate_rotate().unwrap();
        Self { orch, probe, clock }
    }

    /// One daemon loop iteration: advance time, poll ESTOP, tick.
    pub fn step(&mut self) -> MachineStatus {
        self.clock.advance(self.orch.tick_interval_ms());
        self.orch.poll_estop_input().ok();
        self.orch.tick()
    }

    /// Step while Running, bounded.
    pub fn settle(&mut self) -> MachineStatus {
        for _ in 0..50_000 {
            if self.orch.status() != MachineStatus::Running {
                break;
            }
            self.step();
        }
        self.orch.status()
    }

    pub fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }
}

//! Machine control boundary.

use laundry_core::cost::{units, CostAccountant, CostMeter};
use laundry_core::{HardwareFault, MachineStatus};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Consumer name the boundary charges cost under.
pub const CONSUMER: &str = "MachineController";

/// Physical commands against a machine.
pub trait MachineController: Send + Sync {
    /// Returns the status reported by the machine itself.
    fn status(&self, machine_id: &str) -> MachineStatus;

    /// Starts a wash cycle.
    fn start_cycle(&self, machine_id: &str) -> Result<(), HardwareFault>;

    /// Stops a machine immediately, leaving it out of service.
    fn force_stop(&self, machine_id: &str) -> Result<(), HardwareFault>;
}

/// Controller that fails starts at a fixed rate.
///
/// Faults are drawn from a seeded RNG so simulation runs are reproducible.
/// The last commanded state of each machine is remembered and reported by
/// `status`.
pub struct SimulatedController {
    failure_rate: f64,
    rng: Mutex<ChaCha8Rng>,
    states: Mutex<HashMap<String, MachineStatus>>,
}

impl SimulatedController {
    /// Creates a controller failing `failure_rate` of starts (clamped to 0..=1).
    pub fn new(failure_rate: f64, seed: u64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a controller whose starts always succeed.
    pub fn reliable() -> Self {
        Self::new(0.0, 0)
    }

    /// Creates a controller whose starts always fail.
    pub fn faulty() -> Self {
        Self::new(1.0, 0)
    }

    /// Returns the probability that a start faults.
    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl MachineController for SimulatedController {
    fn status(&self, machine_id: &str) -> MachineStatus {
        self.states
            .lock()
            .get(machine_id)
            .copied()
            .unwrap_or(MachineStatus::Available)
    }

    fn start_cycle(&self, machine_id: &str) -> Result<(), HardwareFault> {
        let faulted = self.failure_rate > 0.0 && self.rng.lock().gen_bool(self.failure_rate);
        if faulted {
            self.states
                .lock()
                .insert(machine_id.to_string(), MachineStatus::Error);
            return Err(HardwareFault::new(machine_id, "simulated hardware fault"));
        }
        self.states
            .lock()
            .insert(machine_id.to_string(), MachineStatus::Running);
        Ok(())
    }

    fn force_stop(&self, machine_id: &str) -> Result<(), HardwareFault> {
        self.states
            .lock()
            .insert(machine_id.to_string(), MachineStatus::Error);
        Ok(())
    }
}

/// Charged access to a machine controller.
pub struct MachineControlBoundary {
    controller: Arc<dyn MachineController>,
    meter: CostMeter,
}

impl MachineControlBoundary {
    /// Connects to `controller`.
    pub fn new(controller: Arc<dyn MachineController>, accountant: Arc<CostAccountant>) -> Self {
        let meter = CostMeter::new(accountant, CONSUMER);
        meter.charge(units::CONNECTION);
        Self { controller, meter }
    }

    /// Reads the machine-reported status.
    pub fn status(&self, machine_id: &str) -> MachineStatus {
        self.meter.charge(units::INTERNAL_API_CALL);
        self.controller.status(machine_id)
    }

    /// Starts a cycle on `machine_id`.
    pub fn start_cycle(&self, machine_id: &str) -> Result<(), HardwareFault> {
        self.meter.charge(units::INTERNAL_API_CALL);
        self.controller.start_cycle(machine_id)
    }

    /// Force-stops `machine_id`.
    pub fn force_stop(&self, machine_id: &str) -> Result<(), HardwareFault> {
        self.meter.charge(units::INTERNAL_API_CALL);
        self.controller.force_stop(machine_id)
    }
}

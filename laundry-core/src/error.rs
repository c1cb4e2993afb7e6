//! Core error types.

use thiserror::Error;

/// A machine failed to carry out a physical command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hardware fault on machine {machine_id}: {reason}")]
pub struct HardwareFault {
    /// Machine that reported the fault.
    pub machine_id: String,
    /// Controller-supplied description.
    pub reason: String,
}

impl HardwareFault {
    /// Creates a fault for `machine_id`.
    pub fn new(machine_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_fault_display() {
        let fault = HardwareFault::new("m1", "door sensor tripped");
        assert_eq!(
            fault.to_string(),
            "hardware fault on machine m1: door sensor tripped"
        );
    }
}

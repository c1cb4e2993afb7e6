//! Machine records and lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational status of a machine.
///
/// The workflow engine drives these transitions:
///
/// ```text
/// Available --reserve--> AwaitingDropoff --start(ok)----> Running
///                                       --start(fault)--> Error
/// ```
///
/// `AwaitingPickup` has no producing transition yet; it is reserved for the
/// `Running -> AwaitingPickup` step once cycle completion is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    /// Idle and ready for a new job.
    #[default]
    Available,
    /// Reserved, waiting for the user to drop off and start the cycle.
    AwaitingDropoff,
    /// A cycle is in progress.
    Running,
    /// Cycle complete, waiting for the user to collect.
    AwaitingPickup,
    /// Out of service after a hardware error.
    Error,
}

impl MachineStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [MachineStatus; 5] = [
        MachineStatus::Available,
        MachineStatus::AwaitingDropoff,
        MachineStatus::Running,
        MachineStatus::AwaitingPickup,
        MachineStatus::Error,
    ];

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Available => "AVAILABLE",
            MachineStatus::AwaitingDropoff => "AWAITING_DROPOFF",
            MachineStatus::Running => "RUNNING",
            MachineStatus::AwaitingPickup => "AWAITING_PICKUP",
            MachineStatus::Error => "ERROR",
        }
    }

    /// Returns true if a reservation may claim a machine in this status.
    pub fn is_reservable(&self) -> bool {
        *self == MachineStatus::Available
    }

    /// Returns true if a start command is legal from this status.
    pub fn is_startable(&self) -> bool {
        *self == MachineStatus::AwaitingDropoff
    }

    /// Returns true if a machine in this status is bound to a job.
    pub fn holds_job(&self) -> bool {
        matches!(
            self,
            MachineStatus::AwaitingDropoff | MachineStatus::Running | MachineStatus::AwaitingPickup
        )
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MachineStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown machine status: {}", s))
    }
}

/// A machine as held by the authoritative store.
///
/// Records are plain values: every read from the store hands out an owned
/// copy, so a caller can never observe later store mutations through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRecord {
    /// Unique, immutable machine ID.
    pub machine_id: String,

    /// Location the machine is installed at.
    pub location_id: String,

    /// Job currently bound to the machine.
    pub current_job_id: Option<String>,

    /// Current lifecycle status.
    pub status: MachineStatus,
}

impl MachineRecord {
    /// Creates an available machine with no job.
    pub fn new(machine_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            location_id: location_id.into(),
            current_job_id: None,
            status: MachineStatus::Available,
        }
    }

    /// Sets the initial status.
    pub fn with_status(mut self, status: MachineStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the initial job.
    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.current_job_id = Some(job_id.into());
        self
    }
}

//! Authoritative machine store.

use indexmap::IndexMap;
use laundry_core::cost::{units, CostAccountant, CostMeter};
use laundry_core::{MachineRecord, MachineStatus};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Consumer name the store charges cost under.
pub const CONSUMER: &str = "MachineStore";

/// In-memory store of machine records, keyed by machine ID.
///
/// Iteration follows insertion order. The store accepts any write; lifecycle
/// rules are enforced by the workflow engine.
pub struct MachineStore {
    /// Records indexed by machine ID.
    machines: RwLock<IndexMap<String, MachineRecord>>,

    /// Number of charged store operations.
    accesses: AtomicU64,

    meter: CostMeter,
}

impl MachineStore {
    /// Opens an empty store.
    pub fn new(accountant: Arc<CostAccountant>) -> Self {
        let meter = CostMeter::new(accountant, CONSUMER);
        meter.charge(units::CONNECTION);
        Self {
            machines: RwLock::new(IndexMap::new()),
            accesses: AtomicU64::new(0),
            meter,
        }
    }

    /// Opens a store seeded with `machines`.
    pub fn with_machines(
        accountant: Arc<CostAccountant>,
        machines: impl IntoIterator<Item = MachineRecord>,
    ) -> Self {
        let store = Self::new(accountant);
        for machine in machines {
            store.insert(machine);
        }
        store
    }

    /// Seeds a record. An existing record with the same ID is replaced in place.
    pub fn insert(&self, record: MachineRecord) {
        self.machines
            .write()
            .insert(record.machine_id.clone(), record);
    }

    /// Lists the machines at `location_id`, in store order.
    pub fn list_at_location(&self, location_id: &str) -> Vec<MachineRecord> {
        self.touch(units::DATABASE_READ);
        self.machines
            .read()
            .values()
            .filter(|m| m.location_id == location_id)
            .cloned()
            .collect()
    }

    /// Gets a copy of a machine record.
    pub fn get(&self, machine_id: &str) -> Option<MachineRecord> {
        self.touch(units::DATABASE_READ);
        self.machines.read().get(machine_id).cloned()
    }

    /// Sets a machine's job. Unknown IDs are ignored.
    pub fn set_job_id(&self, machine_id: &str, job_id: &str) {
        self.touch(units::DATABASE_LAZY_WRITE);
        match self.machines.write().get_mut(machine_id) {
            Some(machine) => machine.current_job_id = Some(job_id.to_string()),
            None => tracing::debug!("set_job_id ignored for unknown machine {}", machine_id),
        }
    }

    /// Sets a machine's status. Unknown IDs are ignored.
    pub fn set_status(&self, machine_id: &str, status: MachineStatus) {
        self.touch(units::DATABASE_WRITE);
        match self.machines.write().get_mut(machine_id) {
            Some(machine) => machine.status = status,
            None => tracing::debug!("set_status ignored for unknown machine {}", machine_id),
        }
    }

    /// Returns the number of charged store operations so far.
    pub fn accesses(&self) -> u64 {
        self.accesses.load(Ordering::Relaxed)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.machines.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.machines.read().is_empty()
    }

    fn touch(&self, cost: laundry_core::CostUnits) {
        self.accesses.fetch_add(1, Ordering::Relaxed);
        self.meter.charge(cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (Arc<CostAccountant>, MachineStore) {
        let accountant = Arc::new(CostAccountant::new());
        let store = MachineStore::with_machines(
            accountant.clone(),
            vec![
                MachineRecord::new("m1", "loc-a"),
                MachineRecord::new("m2", "loc-b"),
                MachineRecord::new("m3", "loc-a"),
            ],
        );
        (accountant, store)
    }

    #[test]
    fn test_connection_charged_once() {
        let (accountant, store) = test_store();
        assert_eq!(accountant.usage_of(CONSUMER), units::CONNECTION);
        assert_eq!(store.accesses(), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_list_at_location_in_insertion_order() {
        let (_accountant, store) = test_store();

        let ids: Vec<_> = store
            .list_at_location("loc-a")
            .into_iter()
            .map(|m| m.machine_id)
            .collect();
        assert_eq!(ids, vec!["m1", "m3"]);

        assert!(store.list_at_location("loc-z").is_empty());
        assert_eq!(store.accesses(), 2);
    }

    #[test]
    fn test_get_returns_detached_copy() {
        let (_accountant, store) = test_store();

        let mut copy = store.get("m1").unwrap();
        copy.status = MachineStatus::Error;
        assert_eq!(store.get("m1").unwrap().status, MachineStatus::Available);

        let before = store.get("m1").unwrap();
        store.set_status("m1", MachineStatus::Running);
        assert_eq!(before.status, MachineStatus::Available);
        assert_eq!(store.get("m1").unwrap().status, MachineStatus::Running);
    }

    #[test]
    fn test_get_unknown() {
        let (accountant, store) = test_store();
        assert!(store.get("nope").is_none());
        assert_eq!(store.accesses(), 1);
        assert_eq!(
            accountant.usage_of(CONSUMER),
            units::CONNECTION + units::DATABASE_READ
        );
    }

    #[test]
    fn test_updates_are_independent() {
        let (_accountant, store) = test_store();

        store.set_job_id("m2", "job-1");
        let m2 = store.get("m2").unwrap();
        assert_eq!(m2.current_job_id.as_deref(), Some("job-1"));
        assert_eq!(m2.status, MachineStatus::Available);

        store.set_status("m2", MachineStatus::AwaitingDropoff);
        let m2 = store.get("m2").unwrap();
        assert_eq!(m2.current_job_id.as_deref(), Some("job-1"));
        assert_eq!(m2.status, MachineStatus::AwaitingDropoff);
    }

    #[test]
    fn test_write_cost_tiers() {
        let (accountant, store) = test_store();
        accountant.reset();

        store.set_job_id("m1", "job-1");
        assert_eq!(accountant.usage_of(CONSUMER), units::DATABASE_LAZY_WRITE);

        store.set_status("m1", MachineStatus::AwaitingDropoff);
        assert_eq!(
            accountant.usage_of(CONSUMER),
            units::DATABASE_LAZY_WRITE + units::DATABASE_WRITE
        );
        assert_eq!(store.accesses(), 2);
    }

    #[test]
    fn test_updates_to_unknown_ids_are_ignored() {
        let (accountant, store) = test_store();
        accountant.reset();

        store.set_job_id("ghost", "job-1");
        store.set_status("ghost", MachineStatus::Running);

        assert!(store.get("ghost").is_none());
        assert_eq!(store.len(), 3);
        // Still counted and charged.
        assert_eq!(store.accesses(), 3);
        assert_eq!(
            accountant.usage_of(CONSUMER),
            units::DATABASE_LAZY_WRITE + units::DATABASE_WRITE + units::DATABASE_READ
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let (_accountant, store) = test_store();
        store.insert(MachineRecord::new("m1", "loc-a").with_status(MachineStatus::Error));

        let at_a = store.list_at_location("loc-a");
        assert_eq!(at_a[0].machine_id, "m1");
        assert_eq!(at_a[0].status, MachineStatus::Error);
        assert_eq!(store.len(), 3);
    }
}

//! Simulated resource cost accounting.
//!
//! Every I/O-shaped operation in the system charges a fixed number of units
//! to the accountant under the name of the component performing it. The
//! totals feed the load simulation's capacity report; they have no effect on
//! request handling.
//!
//! The accountant is an explicit instance shared via `Arc`, so each test or
//! simulation run can start from a fresh ledger.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Unit of simulated cost.
pub type CostUnits = u64;

/// Fixed per-operation costs.
pub mod units {
    use super::CostUnits;

    /// Cache read that misses.
    pub const CACHE_READ: CostUnits = 4;
    /// Cache write (insert or overwrite).
    pub const CACHE_WRITE: CostUnits = 6;
    /// Store read.
    pub const DATABASE_READ: CostUnits = 2 * CACHE_READ;
    /// Non-critical store write.
    pub const DATABASE_LAZY_WRITE: CostUnits = 2 * CACHE_WRITE;
    /// Critical store write (2.5x a cache write).
    pub const DATABASE_WRITE: CostUnits = 5 * CACHE_WRITE / 2;
    /// Call to an internal service.
    pub const INTERNAL_API_CALL: CostUnits = 64;
    /// Call to a third-party service.
    pub const EXTERNAL_API_CALL: CostUnits = 2 * INTERNAL_API_CALL;
    /// Establishing a connection.
    pub const CONNECTION: CostUnits = 256;
}

#[derive(Debug, Default)]
struct Ledger {
    total: CostUnits,
    by_consumer: HashMap<String, CostUnits>,
}

/// Running totals of simulated cost, overall and per consumer.
#[derive(Debug, Default)]
pub struct CostAccountant {
    ledger: Mutex<Ledger>,
}

impl CostAccountant {
    /// Creates an empty accountant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `units` to the total and to `consumer`'s share.
    pub fn record(&self, consumer: &str, units: CostUnits) {
        let mut ledger = self.ledger.lock();
        ledger.total += units;
        *ledger.by_consumer.entry(consumer.to_string()).or_default() += units;
    }

    /// Returns the total units recorded.
    pub fn total_units(&self) -> CostUnits {
        self.ledger.lock().total
    }

    /// Returns a copy of the per-consumer totals.
    pub fn usage_by_consumer(&self) -> HashMap<String, CostUnits> {
        self.ledger.lock().by_consumer.clone()
    }

    /// Returns the units recorded for one consumer.
    pub fn usage_of(&self, consumer: &str) -> CostUnits {
        self.ledger
            .lock()
            .by_consumer
            .get(consumer)
            .copied()
            .unwrap_or(0)
    }

    /// Returns `consumer`'s fraction of the total, or 0 if nothing was recorded.
    pub fn share(&self, consumer: &str) -> f64 {
        let ledger = self.ledger.lock();
        if ledger.total == 0 {
            return 0.0;
        }
        let units = ledger.by_consumer.get(consumer).copied().unwrap_or(0);
        units as f64 / ledger.total as f64
    }

    /// Clears all totals.
    pub fn reset(&self) {
        let mut ledger = self.ledger.lock();
        ledger.total = 0;
        ledger.by_consumer.clear();
    }
}

/// A component's handle on the accountant, bound to its consumer name.
#[derive(Debug, Clone)]
pub struct CostMeter {
    accountant: Arc<CostAccountant>,
    consumer: &'static str,
}

impl CostMeter {
    /// Binds `consumer` to `accountant`.
    pub fn new(accountant: Arc<CostAccountant>, consumer: &'static str) -> Self {
        Self {
            accountant,
            consumer,
        }
    }

    /// Charges `units` to this meter's consumer.
    pub fn charge(&self, units: CostUnits) {
        self.accountant.record(self.consumer, units);
    }

    /// Returns the consumer name.
    pub fn consumer(&self) -> &'static str {
        self.consumer
    }

    /// Returns the shared accountant.
    pub fn accountant(&self) -> &Arc<CostAccountant> {
        &self.accountant
    }
}

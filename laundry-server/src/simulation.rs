//! Load simulation for cost analysis.
//!
//! A simulation performs several independent runs. Each run wires a fresh
//! accountant, store, cache and pair of boundaries, seeds every machine as
//! `AVAILABLE`, and replays a random mix of reserve, start and inspect
//! requests through the engine. The resulting `SimulationReport` breaks the
//! charged cost down by consumer and shows how well the read cache absorbed
//! inspect traffic.

use crate::config::{Config, SimulationConfig};
use crate::control::{MachineControlBoundary, SimulatedController};
use crate::error::AuthError;
use crate::identity::{IdentityBoundary, IdentityProvider, TokenIdentityProvider};
use crate::message::Request;
use crate::metrics::Metrics;
use crate::workflow::WorkflowEngine;
use laundry_core::{CostAccountant, CostUnits, MachineRecord};
use laundry_storage::{MachineStore, ReadCache};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Probability that a request is a reservation.
const RESERVE_SHARE: f64 = 0.4;
/// Cumulative probability below which a request is a start, given a queued machine.
const START_SHARE: f64 = 0.7;

/// Measurements of one simulation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Charged units by consumer.
    pub usage: BTreeMap<String, CostUnits>,
    pub total_units: CostUnits,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub store_accesses: u64,
    /// Response count by status code.
    pub responses: BTreeMap<u16, u64>,
}

impl RunReport {
    /// Units charged by `consumer`.
    pub fn units(&self, consumer: &str) -> CostUnits {
        self.usage.get(consumer).copied().unwrap_or(0)
    }

    /// Fraction of the total charged by `consumer` (0 when nothing was charged).
    pub fn share(&self, consumer: &str) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        self.units(consumer) as f64 / self.total_units as f64
    }

    /// Cache hits over lookups (0 when nothing was looked up).
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / lookups as f64
    }

    /// Cache hits per store access (0 when the store was never accessed).
    pub fn hit_access_ratio(&self) -> f64 {
        if self.store_accesses == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / self.store_accesses as f64
    }

    /// Number of responses with `status`.
    pub fn responses_with(&self, status: u16) -> u64 {
        self.responses.get(&status).copied().unwrap_or(0)
    }
}

/// Reports of every run of a simulation, in run order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    pub runs: Vec<RunReport>,
}

impl SimulationReport {
    /// Every consumer charged in any run, sorted by name.
    pub fn consumers(&self) -> Vec<&str> {
        let mut consumers: Vec<&str> = self
            .runs
            .iter()
            .flat_map(|run| run.usage.keys().map(String::as_str))
            .collect();
        consumers.sort_unstable();
        consumers.dedup();
        consumers
    }

    fn fmt_units(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20}", "Resource")?;
        for i in 1..=self.runs.len() {
            write!(f, " {:>14} {:>9}", format!("Run {} Units", i), format!("Run {} %", i))?;
        }
        writeln!(f)?;
        for consumer in self.consumers() {
            write!(f, "{:<20}", consumer)?;
            for run in &self.runs {
                write!(
                    f,
                    " {:>14} {:>9}",
                    run.units(consumer),
                    format!("{:.2}%", run.share(consumer) * 100.0)
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn fmt_cache(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<5} {:>12} {:>12} {:>9}",
            "Run", "Cache Hits", "Cache Misses", "Hit Rate"
        )?;
        for (i, run) in self.runs.iter().enumerate() {
            writeln!(
                f,
                "{:<5} {:>12} {:>12} {:>9}",
                i + 1,
                run.cache_hits,
                run.cache_misses,
                format!("{:.2}%", run.hit_rate() * 100.0)
            )?;
        }
        Ok(())
    }

    fn fmt_ratio(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<5} {:>12} {:>14} {:>16}",
            "Run", "Cache Hits", "Store Accesses", "Hit/Access Ratio"
        )?;
        for (i, run) in self.runs.iter().enumerate() {
            writeln!(
                f,
                "{:<5} {:>12} {:>14} {:>16.4}",
                i + 1,
                run.cache_hits,
                run.store_accesses,
                run.hit_access_ratio()
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_units(f)?;
        writeln!(f)?;
        self.fmt_cache(f)?;
        writeln!(f)?;
        self.fmt_ratio(f)
    }
}

/// Drives simulated load through freshly built engines.
pub struct Simulation {
    config: SimulationConfig,
    cache_capacity: usize,
    identity: Arc<dyn IdentityProvider>,
    metrics: Option<Arc<Metrics>>,
}

impl Simulation {
    /// Creates a simulation whose clients are authorized by `identity`.
    pub fn new(
        config: SimulationConfig,
        cache_capacity: usize,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            cache_capacity,
            identity,
            metrics: None,
        }
    }

    /// Creates a simulation from the full configuration.
    ///
    /// Without configured token hashes the simulation token itself is
    /// accepted.
    pub fn from_config(config: &Config) -> Self {
        let provider = if config.auth.token_hashes.is_empty() {
            TokenIdentityProvider::with_tokens([config.simulation.token.as_str()])
        } else {
            TokenIdentityProvider::from_config(&config.auth)
        };
        Self::new(
            config.simulation.clone(),
            config.cache.capacity,
            Arc::new(provider),
        )
    }

    /// Sets the metrics instance shared by every run.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Performs every run.
    ///
    /// Fails only if the identity provider rejects the simulation token.
    pub fn run(&self) -> Result<SimulationReport, AuthError> {
        let mut runs = Vec::with_capacity(self.config.iterations as usize);
        for iteration in 0..self.config.iterations {
            let report = self.run_once(iteration)?;
            tracing::info!(
                "run {}: {} units, hit rate {:.2}%, {} store accesses",
                iteration + 1,
                report.total_units,
                report.hit_rate() * 100.0,
                report.store_accesses
            );
            runs.push(report);
        }
        Ok(SimulationReport { runs })
    }

    /// Performs a single run against freshly built components.
    pub fn run_once(&self, iteration: u32) -> Result<RunReport, AuthError> {
        let seed = self.config.seed.wrapping_add(u64::from(iteration));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let engine = self.build_engine(seed);
        let machines = self.config.machines.max(1);
        let locations = self.config.locations.max(1);
        let token = self.config.token.as_str();

        let mut queued: VecDeque<String> = VecDeque::new();
        let mut responses = BTreeMap::new();

        for i in 0..self.config.runs {
            let action: f64 = rng.gen();
            let request = if action < RESERVE_SHARE {
                let location = rng.gen_range(0..locations);
                Request::reserve(
                    token,
                    format!("sim-location-{}", location),
                    format!("sim-job-{}", i),
                )
            } else if action < START_SHARE && !queued.is_empty() {
                match queued.pop_front() {
                    Some(machine_id) => Request::start(token, &machine_id),
                    None => continue,
                }
            } else {
                let machine = rng.gen_range(0..machines);
                Request::inspect(token, &format!("sim-machine-{}", machine))
            };

            let is_reserve = action < RESERVE_SHARE;
            let response = engine.handle(&request)?;
            *responses.entry(response.status_code.as_u16()).or_insert(0) += 1;
            if is_reserve {
                if let Some(machine) = response.machine {
                    queued.push_back(machine.machine_id);
                }
            }
        }

        engine.update_gauge_metrics();

        let accountant = engine.accountant();
        Ok(RunReport {
            usage: accountant.usage_by_consumer().into_iter().collect(),
            total_units: accountant.total_units(),
            cache_hits: engine.cache().hits(),
            cache_misses: engine.cache().misses(),
            store_accesses: engine.store().accesses(),
            responses,
        })
    }

    fn build_engine(&self, seed: u64) -> WorkflowEngine {
        let accountant = Arc::new(CostAccountant::new());
        let machines = (0..self.config.machines).map(|i| {
            MachineRecord::new(
                format!("sim-machine-{}", i),
                format!("sim-location-{}", i % self.config.locations.max(1)),
            )
        });
        let store = Arc::new(MachineStore::with_machines(accountant.clone(), machines));
        let cache = Arc::new(ReadCache::new(self.cache_capacity, accountant.clone()));
        let identity = IdentityBoundary::new(self.identity.clone(), accountant.clone());
        let controller = Arc::new(SimulatedController::new(
            self.config.hardware_failure_rate,
            seed.rotate_left(32),
        ));
        let control = MachineControlBoundary::new(controller, accountant.clone());

        let engine = WorkflowEngine::new(accountant, store, cache, identity, control);
        match self.metrics {
            Some(ref metrics) => engine.with_metrics(metrics.clone()),
            None => engine,
        }
    }
}

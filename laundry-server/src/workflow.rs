//! Request workflows.
//!
//! `WorkflowEngine::handle` authenticates a request, resolves its route and
//! runs one of three workflows against the store, the read cache and the
//! machine controller:
//!
//! - **Reserve** claims the first `AVAILABLE` machine at a location.
//! - **Inspect** serves a machine cache-aside.
//! - **Start** starts a reserved machine, recording a hardware fault as
//!   `ERROR` instead of propagating it.
//!
//! Every store mutation is followed by a read-after-write and a
//! write-through into the cache, so the cache never holds a record older
//! than the last mutation made through the engine.

use crate::control::MachineControlBoundary;
use crate::error::{AuthError, WorkflowError};
use crate::identity::IdentityBoundary;
use crate::message::{ReserveParams, Request, Response, StatusCode};
use crate::metrics::Metrics;
use crate::route::Route;
use laundry_core::{CostAccountant, MachineRecord, MachineStatus};
use laundry_storage::{MachineStore, ReadCache};
use parking_lot::Mutex;
use std::sync::Arc;

/// Routes requests and enforces the machine lifecycle.
pub struct WorkflowEngine {
    accountant: Arc<CostAccountant>,
    store: Arc<MachineStore>,
    cache: Arc<ReadCache<MachineRecord>>,
    identity: IdentityBoundary,
    control: MachineControlBoundary,
    /// Held by Reserve, Start and the Inspect miss path so their
    /// read-then-write sequences do not interleave across threads.
    write_lock: Mutex<()>,
    metrics: Option<Arc<Metrics>>,
}

impl WorkflowEngine {
    /// Creates an engine over the given components.
    pub fn new(
        accountant: Arc<CostAccountant>,
        store: Arc<MachineStore>,
        cache: Arc<ReadCache<MachineRecord>>,
        identity: IdentityBoundary,
        control: MachineControlBoundary,
    ) -> Self {
        Self {
            accountant,
            store,
            cache,
            identity,
            control,
            write_lock: Mutex::new(()),
            metrics: None,
        }
    }

    /// Sets the metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the authoritative store.
    pub fn store(&self) -> &Arc<MachineStore> {
        &self.store
    }

    /// Returns the read cache.
    pub fn cache(&self) -> &Arc<ReadCache<MachineRecord>> {
        &self.cache
    }

    /// Returns the accountant every component charges.
    pub fn accountant(&self) -> &Arc<CostAccountant> {
        &self.accountant
    }

    /// Handles a request.
    ///
    /// An invalid token is returned as `Err(AuthError)` before any store or
    /// cache access. Every other outcome, including failures, is an ordinary
    /// response.
    pub fn handle(&self, request: &Request) -> Result<Response, AuthError> {
        let route = Route::resolve(request.method, &request.path);
        let route_name = route.as_ref().map(Route::name).unwrap_or("UNKNOWN");

        let timer = self.metrics.as_ref().map(|m| {
            m.request_duration
                .with_label_values(&[route_name])
                .start_timer()
        });

        let outcome = self.dispatch(request, route);

        let status = match &outcome {
            Ok(_) => StatusCode::Ok,
            Err(e) => e.status_code(),
        };
        if let Some(ref metrics) = self.metrics {
            metrics.requests_total.with_label_values(&[route_name]).inc();
            metrics
                .responses_total
                .with_label_values(&[&status.as_u16().to_string()])
                .inc();
        }
        drop(timer); // Observation happens on drop

        match outcome {
            Ok(machine) => Ok(Response::ok(machine)),
            Err(WorkflowError::Unauthorized) => Err(AuthError::invalid_token()),
            Err(e) => {
                tracing::debug!("{} {} -> {}: {}", request.method, request.path, status, e);
                Ok(e.into_response())
            }
        }
    }

    /// Authenticates and runs a request against its resolved route.
    fn dispatch(
        &self,
        request: &Request,
        route: Option<Route>,
    ) -> Result<MachineRecord, WorkflowError> {
        self.authenticate(&request.token)?;

        let route = route.ok_or_else(|| WorkflowError::UnknownRoute {
            method: request.method,
            path: request.path.clone(),
        })?;

        match route {
            Route::Reserve => {
                let params = ReserveParams::from_request(request)
                    .map_err(|e| WorkflowError::InvalidRequest(e.to_string()))?;
                self.reserve(&params.location_id, &params.job_id)
            }
            Route::Inspect { machine_id } => self.inspect(&machine_id),
            Route::Start { machine_id } => self.start(&machine_id),
        }
    }

    fn authenticate(&self, token: &str) -> Result<(), WorkflowError> {
        if self.identity.validate_token(token) {
            Ok(())
        } else {
            tracing::warn!("rejected request with invalid token");
            Err(WorkflowError::Unauthorized)
        }
    }

    /// Returns the user a token belongs to.
    pub fn identify(&self, token: &str) -> String {
        self.identity.identify(token)
    }

    /// Reserves the first available machine at `location_id` for `job_id`.
    pub fn reserve(&self, location_id: &str, job_id: &str) -> Result<MachineRecord, WorkflowError> {
        let _guard = self.write_lock.lock();

        let candidate = self
            .store
            .list_at_location(location_id)
            .into_iter()
            .find(|m| m.status.is_reservable())
            .ok_or_else(|| WorkflowError::NoAvailableMachine {
                location_id: location_id.to_string(),
            })?;

        self.store
            .set_status(&candidate.machine_id, MachineStatus::AwaitingDropoff);
        self.store.set_job_id(&candidate.machine_id, job_id);
        let machine = self.refresh(&candidate.machine_id)?;

        tracing::info!(
            "reserved machine {} at {} for job {}",
            machine.machine_id,
            location_id,
            job_id
        );
        Ok(machine)
    }

    /// Returns a machine, from the cache when possible.
    ///
    /// A miss reads the store and fills the cache under the write lock, so a
    /// concurrent Reserve or Start cannot have its write-through replaced by
    /// the older record.
    pub fn inspect(&self, machine_id: &str) -> Result<MachineRecord, WorkflowError> {
        if let Some(machine) = self.cache.get(machine_id) {
            return Ok(machine);
        }

        let _guard = self.write_lock.lock();
        let machine = self
            .store
            .get(machine_id)
            .ok_or_else(|| WorkflowError::MachineNotFound {
                machine_id: machine_id.to_string(),
            })?;
        self.cache.put(machine_id, machine.clone());
        Ok(machine)
    }

    /// Starts a reserved machine.
    pub fn start(&self, machine_id: &str) -> Result<MachineRecord, WorkflowError> {
        let _guard = self.write_lock.lock();

        let machine = self
            .store
            .get(machine_id)
            .ok_or_else(|| WorkflowError::MachineNotFound {
                machine_id: machine_id.to_string(),
            })?;

        if !machine.status.is_startable() {
            return Err(WorkflowError::InvalidStateTransition { machine });
        }

        match self.control.start_cycle(machine_id) {
            Ok(()) => {
                self.store.set_status(machine_id, MachineStatus::Running);
                let machine = self.refresh(machine_id)?;
                tracing::info!("started machine {}", machine_id);
                Ok(machine)
            }
            Err(fault) => {
                tracing::warn!("start failed: {}", fault);
                self.store.set_status(machine_id, MachineStatus::Error);
                let machine = self.refresh(machine_id)?;
                Err(WorkflowError::HardwareFault { fault, machine })
            }
        }
    }

    /// Re-reads a mutated record and writes it through to the cache.
    fn refresh(&self, machine_id: &str) -> Result<MachineRecord, WorkflowError> {
        let machine = self
            .store
            .get(machine_id)
            .ok_or_else(|| WorkflowError::MachineNotFound {
                machine_id: machine_id.to_string(),
            })?;
        self.cache.put(machine_id, machine.clone());
        Ok(machine)
    }

    /// Updates gauge metrics from the current component state.
    pub fn update_gauge_metrics(&self) {
        if let Some(ref metrics) = self.metrics {
            for (consumer, units) in self.accountant.usage_by_consumer() {
                metrics
                    .cost_units
                    .with_label_values(&[&consumer])
                    .set(units as f64);
            }
            metrics.cache_hits.set(self.cache.hits() as f64);
            metrics.cache_misses.set(self.cache.misses() as f64);
            metrics.store_accesses.set(self.store.accesses() as f64);
        }
    }
}

//! Prometheus metrics for the workflow engine.
//!
//! Metrics live in a private registry and are exported as Prometheus text
//! via `Metrics::encode`; there is no HTTP listener.

use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

/// Request duration histogram buckets (in seconds).
const DURATION_BUCKETS: &[f64] = &[0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01];

/// Prometheus metrics for laundry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Total requests by route.
    pub requests_total: CounterVec,
    /// Total responses by status code.
    pub responses_total: CounterVec,
    /// Request duration histogram by route.
    pub request_duration: HistogramVec,
    /// Simulated cost units by consumer.
    pub cost_units: GaugeVec,
    /// Read cache hits.
    pub cache_hits: Gauge,
    /// Read cache misses.
    pub cache_misses: Gauge,
    /// Charged store operations.
    pub store_accesses: Gauge,
}

impl Metrics {
    /// Creates a new Metrics instance with all metrics registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("laundry_requests_total", "Total requests by route"),
            &["route"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let responses_total = CounterVec::new(
            Opts::new("laundry_responses_total", "Total responses by status code"),
            &["code"],
        )?;
        registry.register(Box::new(responses_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "laundry_request_duration_seconds",
                "Request duration in seconds by route",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["route"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let cost_units = GaugeVec::new(
            Opts::new("laundry_cost_units", "Simulated cost units by consumer"),
            &["consumer"],
        )?;
        registry.register(Box::new(cost_units.clone()))?;

        let cache_hits = Gauge::with_opts(Opts::new("laundry_cache_hits", "Read cache hits"))?;
        registry.register(Box::new(cache_hits.clone()))?;

        let cache_misses =
            Gauge::with_opts(Opts::new("laundry_cache_misses", "Read cache misses"))?;
        registry.register(Box::new(cache_misses.clone()))?;

        let store_accesses = Gauge::with_opts(Opts::new(
            "laundry_store_accesses",
            "Charged machine store operations",
        ))?;
        registry.register(Box::new(store_accesses.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            responses_total,
            request_duration,
            cost_units,
            cache_hits,
            cache_misses,
            store_accesses,
        })
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

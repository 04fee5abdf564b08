//! Prometheus metrics: cache hit/miss counters, per-operation latency, and
//! HTTP request counts.
//!
//! Each [`Metrics`] owns its registry so tests can assert on counters without
//! sharing global state. Clones share the same underlying collectors.

use std::time::Duration;

use prometheus::{histogram_opts, Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    cache_hits: IntCounterVec,
    cache_misses: IntCounterVec,
    operation_latency: HistogramVec,
    requests: IntCounterVec,
    request_latency: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let cache_hits = IntCounterVec::new(
            Opts::new("cache_hits_total", "Total number of cache hits"),
            &["operation"],
        )
        .expect("create cache hit counter");
        let cache_misses = IntCounterVec::new(
            Opts::new("cache_misses_total", "Total number of cache misses"),
            &["operation"],
        )
        .expect("create cache miss counter");
        let operation_latency = HistogramVec::new(
            histogram_opts!(
                "recommendation_latency_seconds",
                "End-to-end latency of a recommendation, cache lookup included",
                vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
            ),
            &["operation", "outcome"],
        )
        .expect("create operation latency histogram");
        let requests = IntCounterVec::new(
            Opts::new("api_requests_total", "Total number of API requests"),
            &["method", "endpoint", "http_status"],
        )
        .expect("create request counter");
        let request_latency = HistogramVec::new(
            histogram_opts!(
                "api_request_latency_seconds",
                "Latency of API requests in seconds"
            ),
            &["endpoint"],
        )
        .expect("create request latency histogram");

        for collector in [
            Box::new(cache_hits.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(cache_misses.clone()),
            Box::new(operation_latency.clone()),
            Box::new(requests.clone()),
            Box::new(request_latency.clone()),
        ] {
            if let Err(err) = registry.register(collector) {
                tracing::error!(?err, "failed to register metric");
            }
        }

        Self {
            registry,
            cache_hits,
            cache_misses,
            operation_latency,
            requests,
            request_latency,
        }
    }

    pub fn record_cache(&self, operation: &str, hit: bool) {
        let counter = if hit { &self.cache_hits } else { &self.cache_misses };
        counter.with_label_values(&[operation]).inc();
    }

    /// Count of cache hits (`hit = true`) or misses for `operation`.
    pub fn cache_events(&self, operation: &str, hit: bool) -> u64 {
        let counter = if hit { &self.cache_hits } else { &self.cache_misses };
        counter.with_label_values(&[operation]).get()
    }

    pub fn observe_operation(&self, operation: &str, outcome: &str, elapsed: Duration) {
        self.operation_latency
            .with_label_values(&[operation, outcome])
            .observe(elapsed.as_secs_f64());
    }

    /// Number of latency samples recorded for `operation` with `outcome`.
    pub fn operation_samples(&self, operation: &str, outcome: &str) -> u64 {
        self.operation_latency
            .with_label_values(&[operation, outcome])
            .get_sample_count()
    }

    pub fn record_request(&self, method: &str, endpoint: &str, status: u16, elapsed: Duration) {
        self.requests
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.request_latency
            .with_label_values(&[endpoint])
            .observe(elapsed.as_secs_f64());
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(?err, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

//! Observability infrastructure for the metrics collector
//!
//! Provides:
//! - The Prometheus instrument set (host gauges, request counter, latency histogram)
//! - Structured JSON logging with tracing

use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use thiserror::Error;
use tracing::{info, warn};

/// Histogram buckets for request latency (in seconds)
pub const REQUEST_DURATION_BUCKETS: &[f64] = &[0.1, 0.3, 0.5, 1.0, 2.0, 5.0];

pub const CPU_USAGE_PERCENT: &str = "cpu_usage_percent";
pub const MEMORY_USAGE_BYTES: &str = "memory_usage_bytes";
pub const MEMORY_TOTAL_BYTES: &str = "memory_total_bytes";
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Every instrument name exposed on `/metrics`
pub const METRIC_NAMES: [&str; 5] = [
    CPU_USAGE_PERCENT,
    MEMORY_USAGE_BYTES,
    MEMORY_TOTAL_BYTES,
    HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION_SECONDS,
];

/// Errors raised while registering or rendering instruments
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register {name}: {source}")]
    Registration {
        name: &'static str,
        #[source]
        source: prometheus::Error,
    },

    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("encoded metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Collector metrics for Prometheus exposition
///
/// Owns a dedicated registry rather than the process-wide default one.
/// Clones share the same underlying instruments, so a single instance built
/// at startup can be handed to the sampler and to every request handler.
#[derive(Clone)]
pub struct CollectorMetrics {
    registry: Registry,
    cpu_usage_percent: Gauge,
    memory_usage_bytes: Gauge,
    memory_total_bytes: Gauge,
    http_requests_total: Counter,
    http_request_duration_seconds: Histogram,
}

impl CollectorMetrics {
    /// Create the instrument set and register each instrument exactly once
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_registry(Registry::new())
    }

    /// Register the instrument set into an existing registry
    ///
    /// Fails if any of the names is already registered there.
    pub fn with_registry(registry: Registry) -> Result<Self, MetricsError> {
        let cpu_usage_percent = register(
            &registry,
            CPU_USAGE_PERCENT,
            Gauge::new(CPU_USAGE_PERCENT, "Current CPU usage percentage"),
        )?;
        let memory_usage_bytes = register(
            &registry,
            MEMORY_USAGE_BYTES,
            Gauge::new(MEMORY_USAGE_BYTES, "Current memory usage in bytes"),
        )?;
        let memory_total_bytes = register(
            &registry,
            MEMORY_TOTAL_BYTES,
            Gauge::new(MEMORY_TOTAL_BYTES, "Total memory available in bytes"),
        )?;
        let http_requests_total = register(
            &registry,
            HTTP_REQUESTS_TOTAL,
            Counter::with_opts(Opts::new(
                HTTP_REQUESTS_TOTAL,
                "Total number of HTTP requests",
            )),
        )?;
        let http_request_duration_seconds = register(
            &registry,
            HTTP_REQUEST_DURATION_SECONDS,
            Histogram::with_opts(
                HistogramOpts::new(
                    HTTP_REQUEST_DURATION_SECONDS,
                    "Duration of HTTP requests in seconds",
                )
                .buckets(REQUEST_DURATION_BUCKETS.to_vec()),
            ),
        )?;

        Ok(Self {
            registry,
            cpu_usage_percent,
            memory_usage_bytes,
            memory_total_bytes,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// The registry backing this instrument set
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Overwrite the CPU usage gauge
    pub fn set_cpu_usage(&self, percent: f64) {
        self.cpu_usage_percent.set(percent);
    }

    /// Overwrite both memory gauges
    pub fn set_memory(&self, used_bytes: u64, total_bytes: u64) {
        self.memory_usage_bytes.set(used_bytes as f64);
        self.memory_total_bytes.set(total_bytes as f64);
    }

    /// Increment the request counter by one
    pub fn inc_requests(&self) {
        self.http_requests_total.inc();
    }

    /// Record a request latency observation
    pub fn observe_request_duration(&self, duration_secs: f64) {
        self.http_request_duration_seconds.observe(duration_secs);
    }

    pub fn cpu_usage(&self) -> f64 {
        self.cpu_usage_percent.get()
    }

    pub fn memory_used(&self) -> f64 {
        self.memory_usage_bytes.get()
    }

    pub fn memory_total(&self) -> f64 {
        self.memory_total_bytes.get()
    }

    pub fn requests_total(&self) -> f64 {
        self.http_requests_total.get()
    }

    pub fn request_duration_count(&self) -> u64 {
        self.http_request_duration_seconds.get_sample_count()
    }

    pub fn request_duration_sum(&self) -> f64 {
        self.http_request_duration_seconds.get_sample_sum()
    }

    /// Content type of [`render`](Self::render) output
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Render every instrument in the Prometheus text exposition format
    ///
    /// Each instrument is read atomically; there is no cross-instrument snapshot.
    pub fn render(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

fn register<M>(
    registry: &Registry,
    name: &'static str,
    metric: prometheus::Result<M>,
) -> Result<M, MetricsError>
where
    M: prometheus::core::Collector + Clone + 'static,
{
    let metric = metric.map_err(|source| MetricsError::Registration { name, source })?;
    registry
        .register(Box::new(metric.clone()))
        .map_err(|source| MetricsError::Registration { name, source })?;
    Ok(metric)
}

/// Structured logger for collector events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log collector startup
    pub fn log_startup(&self, version: &str, listen_addr: &str) {
        info!(
            event = "collector_started",
            service = %self.service,
            version = %version,
            listen_addr = %listen_addr,
            "Metrics collector started"
        );
    }

    /// Log collector shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "collector_shutdown",
            service = %self.service,
            reason = %reason,
            "Metrics collector shutting down"
        );
    }

    /// Log a background task that ended with an error
    pub fn log_task_failure(&self, task: &str, error: &dyn std::fmt::Display) {
        warn!(
            event = "task_failed",
            service = %self.service,
            task = %task,
            error = %error,
            "Background task exited with an error"
        );
    }
}

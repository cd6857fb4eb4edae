//! Metrics collection and registry.

use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

/// Labels shared by the request histogram and counter.
const REQUEST_LABELS: [&str; 3] = ["method", "route", "status_code"];

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric construction, registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// One completed request, ready to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Registered route pattern, never the raw path.
    pub route: &'a str,
    /// Final response status.
    pub status_code: u16,
    /// Wall-clock request duration.
    pub duration_seconds: f64,
}

/// Prometheus registry for request instrumentation.
///
/// Histogram buckets are fixed at construction. Every series is updated
/// atomically per label set, so concurrent recorders never lose updates.
pub struct MetricsRegistry {
    registry: Registry,

    // Request metrics
    request_duration: HistogramVec,
    requests_total: IntCounterVec,

    // Runtime metrics
    uptime_seconds: Gauge,
}

impl MetricsRegistry {
    /// Creates a new registry with request and runtime metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        // Request metrics
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            ),
            &REQUEST_LABELS,
        )?;
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &REQUEST_LABELS,
        )?;

        // Runtime metrics
        let uptime_seconds = Gauge::new(
            "process_uptime_seconds",
            "Time since the process started in seconds",
        )?;

        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        // CPU, memory, file descriptors and start time, read from procfs.
        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            registry,
            request_duration,
            requests_total,
            uptime_seconds,
        })
    }

    /// Records one completed request.
    pub fn record_request(&self, method: &str, route: &str, status_code: u16, duration_seconds: f64) {
        let status = status_code.to_string();
        let labels = [method, route, status.as_str()];

        self.request_duration
            .with_label_values(&labels)
            .observe(duration_seconds);
        self.requests_total.with_label_values(&labels).inc();
    }

    /// Records a [`MetricSample`].
    pub fn record(&self, sample: &MetricSample<'_>) {
        self.record_request(
            sample.method,
            sample.route,
            sample.status_code,
            sample.duration_seconds,
        );
    }

    /// Current counter value for a label set.
    pub fn request_count(&self, method: &str, route: &str, status_code: u16) -> u64 {
        let status = status_code.to_string();
        self.requests_total
            .with_label_values(&[method, route, status.as_str()])
            .get()
    }

    /// Number of histogram observations for a label set.
    pub fn observation_count(&self, method: &str, route: &str, status_code: u16) -> u64 {
        let status = status_code.to_string();
        self.request_duration
            .with_label_values(&[method, route, status.as_str()])
            .get_sample_count()
    }

    /// Encodes all metrics in Prometheus text format.
    ///
    /// Only the uptime gauge is refreshed; request series are read as-is.
    pub fn encode(&self) -> Result<String, MetricsError> {
        self.uptime_seconds
            .set(crate::process::uptime().as_secs_f64());

        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Content type of [`encode`](Self::encode) output.
    pub fn content_type(&self) -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

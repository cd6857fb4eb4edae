//! Prometheus metrics and request instrumentation.
//!
//! # Metrics Exposed
//!
//! ## Request Metrics
//! - `http_request_duration_seconds` - Histogram of request durations
//! - `http_requests_total` - Counter of completed requests
//!
//! Both are labeled by `method`, `route` (the registered route pattern, or
//! `unmatched`) and `status_code`.
//!
//! ## Runtime Metrics
//! - `process_uptime_seconds` - Time since process start
//! - `process_*` - CPU, memory, fds and start time (Linux only)
//!
//! # Example
//!
//! ```no_run
//! use fault_harness::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.record_request("GET", "/health", 200, 0.004);
//!
//! let text = registry.encode().expect("Failed to encode");
//! assert!(text.contains("http_requests_total"));
//! ```

mod collector;
mod instrument;

pub use collector::{MetricSample, MetricsError, MetricsRegistry};
pub use instrument::{RequestInstrumentor, CLIENT_CLOSED_REQUEST, UNMATCHED_ROUTE};

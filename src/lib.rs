//! Fault Harness Library
//!
//! A controllable fault-injection HTTP service. Alongside a normal request
//! path it exposes routes that deliberately produce error responses, slow
//! responses, memory growth, CPU saturation and failing health checks, so
//! monitoring, alerting and resilience tooling can be exercised against a
//! predictable target.
//!
//! # Architecture
//!
//! Every request flows through the instrumentor:
//!
//! ```text
//! request → instrumentor (start timer) → handler → response → instrumentor (record)
//!                                          ↓                        ↓
//!                                   fault controller      metrics + structured log
//!                                          ↓
//!                                   health evaluator
//! ```
//!
//! # Design Principles
//!
//! - **Single owner**: all fault state lives in one [`FaultController`]
//! - **Faithful faults**: the CPU spike really blocks, the leak really retains memory
//! - **Never crash**: panics in handlers become 500 responses
//! - **Observable**: every request is counted, timed and logged exactly once
//!
//! # Example
//!
//! ```no_run
//! use fault_harness::{config::ServiceConfig, logging::StructuredLogger, server::Server};
//!
//! # async fn run() -> Result<(), fault_harness::server::ServerError> {
//! let server = Server::new(ServiceConfig::default(), StructuredLogger::stdout())?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod fault;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod process;
pub mod server;

// Re-export commonly used types at crate root
pub use config::{ConfigError, FaultConfig, ServerConfig, ServiceConfig};
pub use fault::{CpuBurn, FaultController};
pub use health::{HealthEvaluator, HealthVerdict};
pub use logging::{Fields, LogLevel, StructuredLogger};
pub use metrics::{MetricsRegistry, RequestInstrumentor};
pub use process::MemorySnapshot;
pub use server::{build_router, AppState, Server};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Structured event logging.
//!
//! Every lifecycle, access and fault event is written as one JSON object per
//! line:
//!
//! ```text
//! {"level":"WARN","message":"Memory leak triggered","timestamp":"2024-05-01T12:00:00.000Z","memoryBefore":{...}}
//! ```
//!
//! This stream is the product output consumed by log pipelines. Internal
//! diagnostics of the service itself go through `tracing` instead.

mod logger;
mod record;
mod sink;

pub use logger::StructuredLogger;
pub use record::{Fields, LogLevel, LogRecord};
pub use sink::MemorySink;

//! Synchronous JSON-lines logger.

use super::record::{Fields, LogLevel, LogRecord};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Emits one JSON line per call to a shared output sink.
///
/// Cloning is cheap; clones write to the same sink. Write failures are
/// reported through `tracing` and never reach the caller.
#[derive(Clone)]
pub struct StructuredLogger {
    sink: Sink,
}

impl StructuredLogger {
    /// Creates a logger writing to standard output.
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Creates a logger writing to an arbitrary sink.
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Writes a single record stamped at call time.
    pub fn log(&self, level: LogLevel, message: &str, fields: Fields) {
        let line = LogRecord::now(level, message, fields).to_line();

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(sink, "{}", line).and_then(|()| sink.flush()) {
            tracing::warn!(error = %e, "Failed to write log record");
        }
    }

    /// Shorthand for an INFO record.
    pub fn info(&self, message: &str, fields: Fields) {
        self.log(LogLevel::Info, message, fields);
    }

    /// Shorthand for a WARN record.
    pub fn warn(&self, message: &str, fields: Fields) {
        self.log(LogLevel::Warn, message, fields);
    }

    /// Shorthand for an ERROR record.
    pub fn error(&self, message: &str, fields: Fields) {
        self.log(LogLevel::Error, message, fields);
    }
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for StructuredLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredLogger").finish_non_exhaustive()
    }
}

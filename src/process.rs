//! Process uptime and memory snapshots.

use serde::Serialize;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use sysinfo::System;

static STARTED: OnceLock<Instant> = OnceLock::new();

/// Pins the process start instant. Call once, early in `main`.
///
/// Later calls are no-ops. If never called, the first uptime query pins it.
pub fn mark_start() {
    STARTED.get_or_init(Instant::now);
}

/// Time elapsed since [`mark_start`].
pub fn uptime() -> Duration {
    STARTED.get_or_init(Instant::now).elapsed()
}

/// Memory usage of the current process, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    /// Resident set size.
    pub resident_bytes: u64,
    /// Virtual memory size.
    pub virtual_bytes: u64,
}

impl MemorySnapshot {
    /// Samples the current process.
    ///
    /// Returns zeros when the platform does not expose process statistics.
    pub fn capture() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                tracing::debug!(error = e, "Process id unavailable");
                return Self::default();
            }
        };

        let mut sys = System::new();
        sys.refresh_process(pid);

        sys.process(pid)
            .map(|p| Self {
                resident_bytes: p.memory(),
                virtual_bytes: p.virtual_memory(),
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_is_monotonic() {
        mark_start();
        let first = uptime();
        let second = uptime();
        assert!(second >= first);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = MemorySnapshot {
            resident_bytes: 10,
            virtual_bytes: 20,
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["residentBytes"], 10);
        assert_eq!(json["virtualBytes"], 20);
    }
}

//! Owner of all mutable fault state.

use super::cpu::{self, CpuBurn};
use super::leak::LeakBuffer;
use crate::logging::{Fields, StructuredLogger};
use crate::process::MemorySnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Blocks appended by a default leak trigger.
pub const DEFAULT_LEAK_BLOCKS: usize = 100_000;

/// Bytes per leaked block by default.
pub const DEFAULT_LEAK_BLOCK_SIZE: usize = 1_000;

/// Default CPU burn window.
pub const DEFAULT_CPU_SPIKE: Duration = Duration::from_millis(5_000);

/// State guarded by the controller mutex.
#[derive(Debug)]
struct FaultState {
    health_enabled: bool,
    leak: LeakBuffer,
}

impl Default for FaultState {
    fn default() -> Self {
        Self {
            health_enabled: true,
            leak: LeakBuffer::default(),
        }
    }
}

/// Toggles, triggers and clears injected faults.
///
/// All mutation of fault state goes through this type. Health and leak
/// changes are serialized by one mutex; the request counter is atomic.
/// No operation fails: allocation failure aborts the process as usual.
#[derive(Debug)]
pub struct FaultController {
    state: Mutex<FaultState>,
    request_count: AtomicU64,
    logger: StructuredLogger,
}

impl FaultController {
    /// Creates a controller with health enabled and an empty leak buffer.
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            state: Mutex::new(FaultState::default()),
            request_count: AtomicU64::new(0),
            logger,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns whether the health check currently passes.
    pub fn is_healthy(&self) -> bool {
        self.lock().health_enabled
    }

    /// Forces the health check to fail until re-enabled.
    pub fn disable_health(&self) {
        self.lock().health_enabled = false;
        self.logger.error("Health check disabled", Fields::new());
    }

    /// Restores a passing health check.
    pub fn enable_health(&self) {
        self.lock().health_enabled = true;
        self.logger.info("Health check enabled", Fields::new());
    }

    /// Appends `block_count` blocks of `block_size` bytes to the leak buffer.
    ///
    /// Cumulative across calls with no cap. Returns the new buffer length.
    pub fn trigger_leak(&self, block_count: usize, block_size: usize) -> usize {
        self.logger.warn(
            "Memory leak triggered",
            Fields::new()
                .with("memoryBefore", &MemorySnapshot::capture())
                .with("blockCount", &block_count)
                .with("blockSize", &block_size),
        );

        // Allocate before locking so health reads are not held up.
        let fresh = LeakBuffer::filled(block_count, block_size);
        let len = self.lock().leak.append(fresh);

        self.logger.warn(
            "Memory leak completed",
            Fields::new()
                .with("memoryAfter", &MemorySnapshot::capture())
                .with("leakSize", &len),
        );
        len
    }

    /// Drops every leaked block and returns how many there were.
    pub fn clear_leak(&self) -> usize {
        let released = std::mem::take(&mut self.lock().leak);
        let cleared = released.len();
        // Freed here, outside the lock.
        drop(released);

        self.logger
            .info("Memory cleared", Fields::new().with("clearedItems", &cleared));
        cleared
    }

    /// Busy-waits on the calling thread for `duration`.
    pub fn burn_cpu(&self, duration: Duration) -> CpuBurn {
        self.logger.warn(
            "CPU spike triggered",
            Fields::new().with("durationMs", &duration_ms(duration)),
        );

        let outcome = cpu::burn(duration);

        self.logger.warn(
            "CPU spike completed",
            Fields::new().with("duration", &outcome.elapsed_ms),
        );
        outcome
    }

    /// Counts one root-route hit and returns the new total.
    pub fn increment_request_count(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current root-route hit count.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Current number of leaked blocks.
    pub fn leak_len(&self) -> usize {
        self.lock().leak.len()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use proptest::prelude::*;

    fn controller() -> (FaultController, MemorySink) {
        let sink = MemorySink::default();
        let controller = FaultController::new(StructuredLogger::with_writer(sink.clone()));
        (controller, sink)
    }

    #[test]
    fn test_starts_healthy_and_empty() {
        let (controller, _) = controller();
        assert!(controller.is_healthy());
        assert_eq!(controller.leak_len(), 0);
        assert_eq!(controller.request_count(), 0);
    }

    #[test]
    fn test_toggles_log_every_call() {
        let (controller, sink) = controller();

        controller.disable_health();
        controller.disable_health();
        assert!(!controller.is_healthy());

        controller.enable_health();
        assert!(controller.is_healthy());

        let disabled = sink.find("Health check disabled");
        assert_eq!(disabled.len(), 2);
        assert_eq!(disabled[0]["level"], "ERROR");
        assert_eq!(sink.find("Health check enabled")[0]["level"], "INFO");
    }

    #[test]
    fn test_leak_accumulates_without_cap() {
        let (controller, sink) = controller();

        assert_eq!(controller.trigger_leak(1_000, 16), 1_000);
        assert_eq!(controller.trigger_leak(1_000, 16), 2_000);
        assert_eq!(controller.leak_len(), 2_000);

        let completed = sink.find("Memory leak completed");
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[1]["leakSize"], 2_000);
        assert_eq!(completed[1]["level"], "WARN");
        assert!(completed[1]["memoryAfter"].is_object());
        assert!(sink.find("Memory leak triggered")[0]["memoryBefore"].is_object());
    }

    #[test]
    fn test_clear_returns_total_and_empties() {
        let (controller, sink) = controller();
        controller.trigger_leak(300, 8);
        controller.trigger_leak(200, 8);

        assert_eq!(controller.clear_leak(), 500);
        assert_eq!(controller.leak_len(), 0);
        assert_eq!(controller.clear_leak(), 0);

        let cleared = sink.find("Memory cleared");
        assert_eq!(cleared[0]["clearedItems"], 500);
        assert_eq!(cleared[1]["clearedItems"], 0);
    }

    #[test]
    fn test_burn_cpu_logs_and_waits() {
        let (controller, sink) = controller();

        let outcome = controller.burn_cpu(Duration::from_millis(20));
        assert!(outcome.elapsed_ms >= 20);

        let completed = sink.find("CPU spike completed");
        assert_eq!(completed[0]["duration"], outcome.elapsed_ms);
        assert_eq!(sink.find("CPU spike triggered").len(), 1);
    }

    #[test]
    fn test_request_count_increments() {
        let (controller, _) = controller();
        assert_eq!(controller.increment_request_count(), 1);
        assert_eq!(controller.increment_request_count(), 2);
        assert_eq!(controller.request_count(), 2);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let (controller, _) = controller();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1_000 {
                        controller.increment_request_count();
                    }
                });
            }
        });
        assert_eq!(controller.request_count(), 8_000);
    }

    #[test]
    fn test_health_toggles_run_alongside_large_leak() {
        let (controller, _) = controller();
        std::thread::scope(|scope| {
            scope.spawn(|| controller.trigger_leak(50_000, 64));
            scope.spawn(|| {
                for i in 0..1_000 {
                    if i % 2 == 0 {
                        controller.disable_health();
                    } else {
                        controller.enable_health();
                    }
                    controller.is_healthy();
                }
            });
        });
        assert!(controller.is_healthy());
        assert_eq!(controller.leak_len(), 50_000);
    }

    proptest! {
        #[test]
        fn prop_health_reflects_last_toggle(toggles in proptest::collection::vec(any::<bool>(), 0..32)) {
            let (controller, _) = controller();
            for &enable in &toggles {
                if enable {
                    controller.enable_health();
                } else {
                    controller.disable_health();
                }
            }
            let expected = toggles.last().copied().unwrap_or(true);
            prop_assert_eq!(controller.is_healthy(), expected);
        }

        #[test]
        fn prop_leak_length_is_sum_of_triggers(counts in proptest::collection::vec(0usize..200, 1..8)) {
            let (controller, _) = controller();
            for &count in &counts {
                controller.trigger_leak(count, 4);
            }
            prop_assert_eq!(controller.leak_len(), counts.iter().sum::<usize>());
            prop_assert_eq!(controller.clear_leak(), counts.iter().sum::<usize>());
            prop_assert_eq!(controller.leak_len(), 0);
        }
    }
}

//! Health verdicts driven by the fault controller.

use crate::fault::FaultController;
use crate::logging::{Fields, StructuredLogger};
use crate::process::{self, MemorySnapshot};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a health evaluation, serialized with a `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthVerdict {
    /// Service reports healthy.
    Healthy {
        /// Process uptime in seconds.
        uptime: f64,
        /// Memory usage at evaluation time.
        memory: MemorySnapshot,
        /// UTC evaluation time.
        timestamp: String,
    },
    /// Health check has been disabled.
    Unhealthy {
        /// Why the check fails.
        reason: String,
    },
}

impl HealthVerdict {
    /// Returns true for [`HealthVerdict::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthVerdict::Healthy { .. })
    }
}

/// Produces health verdicts. Read-only with respect to fault state.
#[derive(Debug, Clone)]
pub struct HealthEvaluator {
    faults: Arc<FaultController>,
    logger: StructuredLogger,
}

impl HealthEvaluator {
    /// Creates an evaluator reading the given controller.
    pub fn new(faults: Arc<FaultController>, logger: StructuredLogger) -> Self {
        Self { faults, logger }
    }

    /// Evaluates current health.
    pub fn evaluate(&self) -> HealthVerdict {
        if !self.faults.is_healthy() {
            self.logger
                .error("Health check failed - service unhealthy", Fields::new());
            return HealthVerdict::Unhealthy {
                reason: "Service degraded".to_owned(),
            };
        }

        HealthVerdict::Healthy {
            uptime: process::uptime().as_secs_f64(),
            memory: MemorySnapshot::capture(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

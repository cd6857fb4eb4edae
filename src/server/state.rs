//! Shared router state.

use crate::config::{FaultConfig, ServiceConfig};
use crate::fault::FaultController;
use crate::health::HealthEvaluator;
use crate::logging::StructuredLogger;
use crate::metrics::{MetricsError, MetricsRegistry, RequestInstrumentor};
use std::sync::Arc;

/// Identity reported by the root route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Deployed version string.
    pub version: String,
    /// Deployment environment name.
    pub environment: String,
}

/// Everything a handler may need. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Service identity.
    pub info: Arc<ServiceInfo>,
    /// Fault parameters for the `/error/*` routes.
    pub fault_config: Arc<FaultConfig>,
    /// Sole owner of fault state.
    pub faults: Arc<FaultController>,
    /// Request metrics.
    pub metrics: Arc<MetricsRegistry>,
    /// Health verdicts.
    pub health: HealthEvaluator,
    /// Event log.
    pub logger: StructuredLogger,
}

impl AppState {
    /// Wires all components from configuration.
    pub fn new(config: &ServiceConfig, logger: StructuredLogger) -> Result<Self, MetricsError> {
        let faults = Arc::new(FaultController::new(logger.clone()));
        let health = HealthEvaluator::new(Arc::clone(&faults), logger.clone());

        Ok(Self {
            info: Arc::new(ServiceInfo {
                version: config.server.version.clone(),
                environment: config.server.environment.clone(),
            }),
            fault_config: Arc::new(config.faults.clone()),
            faults,
            metrics: Arc::new(MetricsRegistry::new()?),
            health,
            logger,
        })
    }

    /// Instrumentor feeding this state's metrics and logger.
    pub fn instrumentor(&self) -> RequestInstrumentor {
        RequestInstrumentor::new(Arc::clone(&self.metrics), self.logger.clone())
    }
}

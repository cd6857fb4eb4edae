//! HTTP server exposing the normal path, the fault routes and `/metrics`.

mod routes;
mod state;

pub use routes::{build_router, instrumented, SERVICE_NAME};
pub use state::{AppState, ServiceInfo};

use crate::config::ServiceConfig;
use crate::logging::{Fields, StructuredLogger};
use crate::metrics::MetricsError;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur during server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// The metrics registry could not be built.
    #[error("failed to initialize metrics: {0}")]
    Metrics(#[from] MetricsError),

    /// The server loop exited with an error.
    #[error("server error: {0}")]
    Server(String),
}

/// The fault-injection HTTP service.
pub struct Server {
    config: ServiceConfig,
    state: AppState,
}

impl Server {
    /// Creates a server and wires its components.
    pub fn new(config: ServiceConfig, logger: StructuredLogger) -> Result<Self, ServerError> {
        let state = AppState::new(&config, logger)?;
        Ok(Self { config, state })
    }

    /// Starts the HTTP server.
    ///
    /// Runs until SIGTERM or Ctrl-C, then stops accepting connections and
    /// waits for in-flight requests to finish.
    pub async fn run(self) -> Result<(), ServerError> {
        let bind_addr = self.config.server.bind_addr();
        let logger = self.state.logger.clone();
        let app = build_router(self.state);

        let listener = tokio::net::TcpListener::bind(bind_addr).await?;

        logger.info(
            &format!("Server started on port {}", bind_addr.port()),
            Fields::new().with("version", &self.config.server.version),
        );
        tracing::info!(addr = %bind_addr, "Fault harness listening");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(logger))
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Resolves on the first SIGTERM or Ctrl-C and logs it once.
async fn shutdown_signal(logger: StructuredLogger) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    logger.info(
        &format!("{} received, shutting down gracefully", signal),
        Fields::new(),
    );
}

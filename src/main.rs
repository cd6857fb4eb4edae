//! Fault Harness CLI
//!
//! Starts the fault-injection HTTP service.

use clap::Parser;
use fault_harness::{
    config::{ConfigError, ServiceConfig},
    logging::StructuredLogger,
    server::Server,
};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::info;

/// Controllable fault-injection HTTP service.
#[derive(Debug, Parser)]
#[command(name = "fault-harness", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind.
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Version string reported by `/`.
    #[arg(long = "app-version", env = "APP_VERSION")]
    app_version: Option<String>,

    /// Deployment environment reported by `/`.
    #[arg(long, env = "NODE_ENV")]
    environment: Option<String>,

    /// Runtime worker threads (1 = single event loop).
    #[arg(long)]
    worker_threads: Option<usize>,
}

impl Cli {
    fn load_config(&self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(version) = &self.app_version {
            config.server.version = version.clone();
        }
        if let Some(environment) = &self.environment {
            config.server.environment = environment.clone();
        }
        if let Some(threads) = self.worker_threads {
            config.server.worker_threads = threads;
        }

        config.validate()?;
        Ok(config)
    }
}

fn build_runtime(worker_threads: usize) -> std::io::Result<tokio::runtime::Runtime> {
    if worker_threads == 1 {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()
    }
}

fn main() {
    // Diagnostics go to stderr; stdout carries the structured event log.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    fault_harness::process::mark_start();

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Fault Harness v{} ({} worker thread(s))",
        fault_harness::VERSION,
        config.server.worker_threads
    );

    let runtime = match build_runtime(config.server.worker_threads) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::new(config, StructuredLogger::stdout()) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to initialize server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(server.run()) {
        eprintln!("Server failed: {}", e);
        std::process::exit(1);
    }
}

//! Service configuration.
//!
//! Settings come from an optional TOML file, then CLI flags and environment
//! variables override individual values (see `main.rs`).
//!
//! ```toml
//! [server]
//! port = 3000
//! version = "1.0.0"
//! environment = "staging"
//! worker_threads = 1
//!
//! [faults]
//! leak_block_count = 100000
//! leak_block_size = 1000
//! cpu_spike_ms = 5000
//! timeout_delay_ms = 30000
//! isolate_cpu_spike = false
//! ```

use crate::fault::{DEFAULT_CPU_SPIKE, DEFAULT_LEAK_BLOCKS, DEFAULT_LEAK_BLOCK_SIZE};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Port 0 was configured.
    #[error("invalid port (must be 1-65535)")]
    InvalidPort,
    /// No runtime worker threads.
    #[error("invalid worker thread count (must be at least 1)")]
    InvalidWorkerThreads,
    /// Leak blocks of zero bytes.
    #[error("invalid leak block size (must be at least 1 byte)")]
    InvalidLeakBlockSize,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServiceConfig {
    /// Listener and identity settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Fault route parameters.
    #[serde(default)]
    pub faults: FaultConfig,
}

/// Listener and identity settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: IpAddr,
    /// TCP port to listen on.
    pub port: u16,
    /// Version string reported by `/`.
    pub version: String,
    /// Deployment environment reported by `/`.
    pub environment: String,
    /// Runtime worker threads. 1 runs a single cooperative event loop.
    pub worker_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            version: "1.0.0".to_owned(),
            environment: "development".to_owned(),
            worker_threads: 1,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Fault parameters used by the `/error/*` routes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaultConfig {
    /// Blocks appended per leak trigger.
    pub leak_block_count: usize,
    /// Bytes per leaked block.
    pub leak_block_size: usize,
    /// CPU spike duration in milliseconds.
    pub cpu_spike_ms: u64,
    /// Simulated upstream delay in milliseconds.
    pub timeout_delay_ms: u64,
    /// Run the CPU spike on the blocking pool instead of the request task.
    pub isolate_cpu_spike: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            leak_block_count: DEFAULT_LEAK_BLOCKS,
            leak_block_size: DEFAULT_LEAK_BLOCK_SIZE,
            cpu_spike_ms: DEFAULT_CPU_SPIKE.as_millis() as u64,
            timeout_delay_ms: 30_000,
            isolate_cpu_spike: false,
        }
    }
}

impl FaultConfig {
    /// CPU spike window.
    pub fn cpu_spike(&self) -> Duration {
        Duration::from_millis(self.cpu_spike_ms)
    }

    /// Simulated upstream delay.
    pub fn timeout_delay(&self) -> Duration {
        Duration::from_millis(self.timeout_delay_ms)
    }
}

impl ServiceConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.server.worker_threads == 0 {
            return Err(ConfigError::InvalidWorkerThreads);
        }
        if self.faults.leak_block_size == 0 {
            return Err(ConfigError::InvalidLeakBlockSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.faults.leak_block_count, 100_000);
        assert_eq!(config.faults.cpu_spike(), Duration::from_secs(5));
        assert_eq!(config.faults.timeout_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = ServiceConfig::from_toml(
            r#"
            [server]
            port = 8080
            environment = "staging"

            [faults]
            cpu_spike_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, "staging");
        assert_eq!(config.server.version, "1.0.0");
        assert_eq!(config.faults.cpu_spike_ms, 250);
        assert_eq!(config.faults.leak_block_size, 1_000);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = ServiceConfig::from_toml("").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_zero_worker_threads_invalid() {
        let mut config = ServiceConfig::default();
        config.server.worker_threads = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWorkerThreads)
        ));
    }

    #[test]
    fn test_zero_port_invalid() {
        let result = ServiceConfig::from_toml("[server]\nport = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn test_zero_block_size_invalid() {
        let result = ServiceConfig::from_toml("[faults]\nleak_block_size = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidLeakBlockSize)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = ServiceConfig::from_toml("[server\nport = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr().port(), 3000);
    }
}

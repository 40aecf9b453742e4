//! TOML configuration for the `parklink` binary.
//!
//! ```toml
//! [controller]
//! devices = ["192.168.1.119", "192.168.1.101"]
//! port = 8080
//! timeout_secs = 2
//! poll_interval_ms = 500
//!
//! [agent]
//! bind = "0.0.0.0:8080"
//! debounce_ms = 150
//! sample_period_ms = 20
//! ```
//!
//! Every key is optional; a missing file means all defaults.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use parklink_agent::AgentConfig;
use parklink_core::DeviceEndpoint;
use parklink_core::constants::{
    DEFAULT_ACTIVATION_PAUSE_MS, DEFAULT_CHECK_TIMEOUT_MS, DEFAULT_DEBOUNCE_MS, DEFAULT_PORT,
    DEFAULT_SAMPLE_PERIOD_MS, DEFAULT_TIMEOUT_SECS,
};
use parklink_network::{LinkConfig, PoolConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParklinkConfig {
    pub controller: ControllerConfig,
    pub agent: AgentSection,
}

/// `[controller]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Endpoint addresses, one link each, in pool order.
    pub devices: Vec<String>,
    pub port: u16,
    /// Per-request timeout for commands and status.
    pub timeout_secs: u64,
    pub check_timeout_ms: u64,
    pub activation_pause_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            devices: vec!["192.168.1.119".to_string(), "192.168.1.101".to_string()],
            port: DEFAULT_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT_MS,
            activation_pause_ms: DEFAULT_ACTIVATION_PAUSE_MS,
            poll_interval_ms: 500,
        }
    }
}

impl ControllerConfig {
    pub fn endpoints(&self) -> Result<Vec<DeviceEndpoint>, ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::Invalid("no devices configured".into()));
        }
        self.devices
            .iter()
            .map(|address| {
                DeviceEndpoint::new(
                    address.as_str(),
                    self.port,
                    Duration::from_secs(self.timeout_secs),
                )
                .map_err(|e| ConfigError::Invalid(e.to_string()))
            })
            .collect()
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            check_timeout: Duration::from_millis(self.check_timeout_ms),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            activation_pause: Duration::from_millis(self.activation_pause_ms),
        }
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
        }
        Ok(Duration::from_millis(self.poll_interval_ms))
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub bind: String,
    pub debounce_ms: u64,
    pub sample_period_ms: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
        }
    }
}

impl AgentSection {
    pub fn agent_config(&self) -> Result<AgentConfig, ConfigError> {
        let bind_addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad bind address: {}", self.bind)))?;
        if self.sample_period_ms == 0 {
            return Err(ConfigError::Invalid("sample_period_ms must be > 0".into()));
        }
        Ok(AgentConfig {
            bind_addr,
            debounce: Duration::from_millis(self.debounce_ms),
            sample_period: Duration::from_millis(self.sample_period_ms),
            ..AgentConfig::default()
        })
    }
}

impl ParklinkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given and present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }
}

//! Server configuration.
//!
//! # Example configuration
//!
//! ```toml
//! bind_address = "0.0.0.0"
//! port = 8080
//! read_only = false
//! sweep_interval = "30s"
//!
//! [locks]
//! default_timeout = "1h"
//! max_timeout = "1day"
//! temp_timeout = "10s"
//! ```

use anyhow::{Context, Result};
use lockdav_core::LockConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

/// Configuration for the WebDAV server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_address: IpAddr,
    /// Port to bind to (0 = auto-assign).
    pub port: u16,
    /// Refuse every state-changing method with `403 Forbidden`.
    pub read_only: bool,
    /// How often expired locks are purged from memory.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Lock durations.
    pub locks: LockConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            read_only: false,
            sweep_interval: Duration::from_secs(30),
            locks: LockConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Sets the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets read-only mode.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Sets the lock durations.
    #[must_use]
    pub fn locks(mut self, locks: LockConfig) -> Self {
        self.locks = locks;
        self
    }
}

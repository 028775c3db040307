//! Configuration Types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub proxy: ProxyConfig,
    pub check: CheckConfig,
    pub logging: LoggingConfig,
}

/// Proxy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// `socks4://host:port` or `socks4a://host:port`
    pub url: String,
    /// `connect` or `bind`
    pub command: String,
    /// Bound on proxy connect plus handshake
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Connectivity check configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckConfig {
    /// `http://` URL fetched through the proxy
    pub url: String,
    /// Bound on the whole check, proxy dial included
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            url: "socks4a://127.0.0.1:1080".to_string(),
            command: "connect".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            url: "http://icanhazip.com/".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

//! Configuration Manager

use super::{Config, ProxyConfig};
use crate::dialer::Socks4Dialer;
use crate::protocol::{Command, Scheme};
use crate::Result;
use anyhow::{bail, Context};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::debug!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("SOCKS4_PROXY_URL") {
            config.proxy.url = url;
        }

        if let Ok(command) = std::env::var("SOCKS4_COMMAND") {
            config.proxy.command = command;
        }

        if let Ok(timeout) = std::env::var("SOCKS4_TIMEOUT") {
            config.proxy.timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid SOCKS4_TIMEOUT: {}", timeout))?;
        }

        if let Ok(url) = std::env::var("SOCKS4_CHECK_URL") {
            config.check.url = url;
        }

        if let Ok(log_level) = std::env::var("SOCKS4_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.proxy
            .validate()
            .with_context(|| "Proxy configuration validation failed")?;

        self.validate_check_config()
            .with_context(|| "Check configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_check_config(&self) -> Result<()> {
        let url = Url::parse(&self.check.url)
            .with_context(|| format!("Invalid check.url: {}", self.check.url))?;

        if url.scheme() != "http" {
            bail!("check.url must be an http:// URL");
        }

        if url.host_str().is_none() {
            bail!("check.url has no host");
        }

        validate_timeout("check.timeout", self.check.timeout)
    }

    fn validate_logging_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "logging.level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        proxy: Option<&str>,
        url: Option<&str>,
        timeout: Option<u64>,
        log_level: Option<&str>,
    ) {
        if let Some(proxy) = proxy {
            self.proxy.url = proxy.to_string();
            tracing::debug!("CLI override: proxy set to {}", proxy);
        }

        if let Some(url) = url {
            self.check.url = url.to_string();
            tracing::debug!("CLI override: check url set to {}", url);
        }

        if let Some(timeout_secs) = timeout {
            let timeout = Duration::from_secs(timeout_secs);
            self.proxy.timeout = timeout;
            self.check.timeout = timeout;
            tracing::debug!("CLI override: timeouts set to {}s", timeout_secs);
        }

        if let Some(level) = log_level {
            self.logging.level = level.to_string();
        }
    }
}

impl ProxyConfig {
    /// Validate the proxy section
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url).with_context(|| format!("Invalid proxy.url: {}", self.url))?;

        url.scheme()
            .parse::<Scheme>()
            .with_context(|| "proxy.url scheme must be 'socks4' or 'socks4a'")?;

        if url.host_str().map_or(true, str::is_empty) {
            bail!("proxy.url has no host");
        }

        self.command
            .parse::<Command>()
            .with_context(|| "proxy.command must be 'connect' or 'bind'")?;

        validate_timeout("proxy.timeout", self.timeout)
    }

    /// Build the dialer this section describes
    pub fn build_dialer(&self) -> Result<Socks4Dialer> {
        let url = Url::parse(&self.url).with_context(|| format!("Invalid proxy.url: {}", self.url))?;
        let command: Command = self.command.parse()?;

        let dialer = Socks4Dialer::from_url(&url)?.with_command(command);
        Ok(dialer)
    }
}

fn validate_timeout(name: &str, timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        bail!("{} must be greater than 0", name);
    }

    if timeout > Duration::from_secs(3600) {
        bail!("{} cannot exceed 1 hour", name);
    }

    Ok(())
}

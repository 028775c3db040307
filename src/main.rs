//! socks4-check - SOCKS4 / SOCKS4a proxy connectivity check
//!
//! Fetches an http:// URL through a SOCKS4 proxy and prints the body.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use socks4dialer::check::{fetch_through_proxy, CheckTimeouts};
use socks4dialer::config::ConfigManager;

/// CLI arguments for socks4-check
#[derive(Parser, Debug)]
#[command(name = "socks4-check")]
#[command(about = "Check a SOCKS4 / SOCKS4a proxy by fetching a URL through it")]
#[command(version)]
#[command(long_about = "
Check a SOCKS4 / SOCKS4a proxy by fetching an http:// URL through it.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  SOCKS4_PROXY_URL  - Proxy URL (e.g., socks4a://127.0.0.1:1080)
  SOCKS4_COMMAND    - SOCKS command (connect, bind)
  SOCKS4_TIMEOUT    - Dial timeout (e.g., 10s)
  SOCKS4_CHECK_URL  - URL to fetch through the proxy
  SOCKS4_LOG_LEVEL  - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "socks4.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Proxy URL (overrides config file)
    #[arg(short, long, help = "Proxy URL (e.g., socks4://1.2.3.4:1080)")]
    pub proxy: Option<String>,

    /// URL to fetch (overrides config file)
    #[arg(short, long, help = "http:// URL to fetch through the proxy")]
    pub url: Option<String>,

    /// Timeout in seconds
    #[arg(short, long, help = "Timeout in seconds")]
    pub timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let log_filter = init_tracing(&args)?;

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(
        args.proxy.as_deref(),
        args.url.as_deref(),
        args.timeout,
        args.log_level.as_deref(),
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    apply_configured_level(&args, &log_filter, &config.logging.level)?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Proxy: {}", config.proxy.url);
        info!("  Command: {}", config.proxy.command);
        info!("  Proxy timeout: {:?}", config.proxy.timeout);
        info!("  Check url: {}", config.check.url);
        info!("  Check timeout: {:?}", config.check.timeout);
        return Ok(());
    }

    let dialer = config.proxy.build_dialer()?;
    info!(
        "Checking {} ({}) with {}",
        dialer.config().proxy_address,
        dialer.config().scheme,
        config.check.url
    );

    let timeouts = CheckTimeouts {
        dial: config.proxy.timeout,
        total: config.check.timeout,
    };
    match fetch_through_proxy(&dialer, &config.check.url, timeouts).await {
        Ok(body) => {
            println!("{}", String::from_utf8_lossy(&body).trim_end());
            Ok(())
        }
        Err(e) => {
            error!("Proxy check failed: {:#}", e);
            Err(e)
        }
    }
}

/// Initialize tracing/logging before anything else logs.
///
/// Level priority: `RUST_LOG`, `--verbose`, `--log-level`, `SOCKS4_LOG_LEVEL`,
/// then `info` until the configuration is loaded.
fn init_tracing(args: &CliArgs) -> Result<reload::Handle<EnvFilter, Registry>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if args.verbose {
            "debug".to_string()
        } else if let Some(level) = &args.log_level {
            level.clone()
        } else {
            std::env::var("SOCKS4_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
        };
        EnvFilter::new(level)
    });
    let (filter, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_level(true),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(handle)
}

/// Switch to the level from the configuration file unless overridden
fn apply_configured_level(
    args: &CliArgs,
    handle: &reload::Handle<EnvFilter, Registry>,
    level: &str,
) -> Result<()> {
    if args.verbose || std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(());
    }

    handle
        .reload(EnvFilter::new(level))
        .context("Failed to apply configured log level")
}

//! SOCKS4 / SOCKS4a Dialer
//!
//! Each dial validates its inputs, opens its own connection to the proxy,
//! runs one cancellable handshake over it, and either hands the connection
//! to the caller or drops it. Every failure is reported as a [`DialError`]
//! carrying the operation, network, proxy and target of the call.

use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;
use url::Url;

use super::{BoxedStream, Dial, DirectDialer, Network, SocksStream};
use crate::address::{host_port_from_url, resolve_ipv4, split_host_port, Resolve, SystemResolver};
use crate::context::Context;
use crate::error::{DialError, SocksError};
use crate::protocol::{
    build_request, Command, Scheme, Socks4Handler, SocksAddress, SOCKS4A_SENTINEL_IP,
    SOCKS_DEFAULT_PORT,
};

/// Immutable settings of a [`Socks4Dialer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialerConfig {
    /// Network between the client and the proxy
    pub proxy_network: Network,
    /// Proxy `host:port`
    pub proxy_address: String,
    pub scheme: Scheme,
    pub command: Command,
}

impl DialerConfig {
    pub fn new(proxy_address: impl Into<String>, scheme: Scheme) -> Self {
        Self {
            proxy_network: Network::Tcp,
            proxy_address: proxy_address.into(),
            scheme,
            command: Command::Connect,
        }
    }
}

/// Validated target of one dial
struct Target {
    host: String,
    port: u16,
}

/// SOCKS4 client dialer.
///
/// Holds no per-call state, so one dialer can serve concurrent dials.
#[derive(Clone)]
pub struct Socks4Dialer {
    config: DialerConfig,
    proxy_dial: Option<Arc<dyn Dial>>,
    resolver: Arc<dyn Resolve>,
}

impl Socks4Dialer {
    /// Create a dialer that reaches the proxy with a direct TCP connection
    pub fn new(config: DialerConfig) -> Self {
        Self {
            config,
            proxy_dial: None,
            resolver: Arc::new(SystemResolver),
        }
    }

    /// Create a CONNECT dialer from a `socks4://` or `socks4a://` URL.
    ///
    /// The port defaults to 1080.
    pub fn from_url(url: &Url) -> Result<Self, SocksError> {
        let scheme: Scheme = url.scheme().parse()?;
        let proxy_address = host_port_from_url(url, SOCKS_DEFAULT_PORT)
            .ok_or_else(|| SocksError::Config(format!("proxy url has no host: {url}")))?;

        Ok(Self::new(DialerConfig::new(proxy_address, scheme)))
    }

    /// Reach the proxy through `dial` instead of a direct TCP connection
    pub fn with_proxy_dial(mut self, dial: Arc<dyn Dial>) -> Self {
        self.proxy_dial = Some(dial);
        self
    }

    /// Resolve SOCKS4 targets with `resolver`
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.config.command = command;
        self
    }

    pub fn config(&self) -> &DialerConfig {
        &self.config
    }

    /// Connect to `address` on `network` through the proxy.
    ///
    /// On success the returned stream owns the proxy connection and reports
    /// the bound address from the proxy's reply.
    pub async fn dial_context(
        &self,
        ctx: &Context,
        network: &str,
        address: &str,
    ) -> Result<SocksStream, DialError> {
        let target = self
            .validate_target(network, address)
            .map_err(|e| self.op_error(network, address, e))?;

        let mut conn = self
            .connect_to_proxy(ctx)
            .await
            .map_err(|e| self.op_error(network, address, e))?;

        // The connection is dropped, and so closed, on failure
        let bound = self
            .handshake(ctx, &mut conn, target)
            .await
            .map_err(|e| self.op_error(network, address, e))?;

        Ok(SocksStream::new(conn, bound))
    }

    /// Run the handshake over `conn`, a connection already open to the proxy.
    ///
    /// Returns the bound address. `conn` is left open either way; closing it
    /// is up to the caller.
    pub async fn dial_with_conn<S>(
        &self,
        ctx: &Context,
        conn: &mut S,
        network: &str,
        address: &str,
    ) -> Result<SocksAddress, DialError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let target = self
            .validate_target(network, address)
            .map_err(|e| self.op_error(network, address, e))?;

        self.handshake(ctx, conn, target)
            .await
            .map_err(|e| self.op_error(network, address, e))
    }

    /// Connect without a cancellation context and return the raw proxy
    /// connection rather than a [`SocksStream`].
    pub async fn dial_raw(&self, network: &str, address: &str) -> Result<BoxedStream, DialError> {
        let ctx = Context::background();
        let target = self
            .validate_target(network, address)
            .map_err(|e| self.op_error(network, address, e))?;

        let mut conn = self
            .connect_to_proxy(&ctx)
            .await
            .map_err(|e| self.op_error(network, address, e))?;

        self.handshake(&ctx, &mut conn, target)
            .await
            .map_err(|e| self.op_error(network, address, e))?;

        Ok(conn)
    }

    fn validate_target(&self, network: &str, address: &str) -> Result<Target, SocksError> {
        network.parse::<Network>()?;
        let (host, port) = split_host_port(address)?;
        Ok(Target { host, port })
    }

    async fn connect_to_proxy(&self, ctx: &Context) -> Result<BoxedStream, SocksError> {
        let network = self.config.proxy_network.as_str();
        let address = self.config.proxy_address.as_str();
        debug!("Connecting to SOCKS4 proxy {} over {}", address, network);

        let result = match &self.proxy_dial {
            Some(dial) => dial.dial(ctx, network, address).await,
            None => DirectDialer.dial(ctx, network, address).await,
        };

        result.map_err(SocksError::transport)
    }

    async fn handshake<S>(&self, ctx: &Context, conn: &mut S, target: Target) -> Result<SocksAddress, SocksError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let DialerConfig { scheme, command, .. } = self.config;

        ctx.run(async move {
            let ip = if scheme.resolves_locally() {
                resolve_ipv4(self.resolver.as_ref(), &target.host).await?
            } else {
                Ipv4Addr::from(SOCKS4A_SENTINEL_IP)
            };

            debug!(
                "SOCKS4 {} to {}:{} via {} ({})",
                command, target.host, target.port, self.config.proxy_address, scheme
            );
            let request = build_request(command, scheme, &target.host, target.port, ip);
            Socks4Handler::new(conn).handshake(&request).await
        })
        .await
    }

    fn path_addrs(&self, address: &str) -> (Option<SocksAddress>, Option<SocksAddress>) {
        (
            SocksAddress::parse(&self.config.proxy_address).ok(),
            SocksAddress::parse(address).ok(),
        )
    }

    fn op_error(&self, network: &str, address: &str, source: SocksError) -> DialError {
        let (proxy, target) = self.path_addrs(address);
        DialError {
            op: self.config.command.label(),
            network: network.to_string(),
            proxy,
            target,
            source,
        }
    }
}

impl fmt::Debug for Socks4Dialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socks4Dialer")
            .field("config", &self.config)
            .field("proxy_dial", &self.proxy_dial.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Dial for Socks4Dialer {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> io::Result<BoxedStream> {
        let stream = self.dial_context(ctx, network, address).await?;
        Ok(Box::new(stream))
    }
}

//! Direct TCP Dialer

use std::io;

use async_trait::async_trait;
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

use super::{BoxedStream, Dial, Network};
use crate::context::Context;
use crate::error::SocksError;

/// Plain TCP connect, used to reach the proxy when no dial capability is injected
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectDialer;

impl DirectDialer {
    /// Connect to `address`, trying each resolved address of the network's family in order
    pub async fn connect(&self, ctx: &Context, network: Network, address: &str) -> Result<TcpStream, SocksError> {
        ctx.run(connect_tcp(network, address)).await
    }
}

#[async_trait]
impl Dial for DirectDialer {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> io::Result<BoxedStream> {
        let network: Network = network.parse()?;
        let stream = self.connect(ctx, network, address).await?;
        Ok(Box::new(stream))
    }
}

async fn connect_tcp(network: Network, address: &str) -> Result<TcpStream, SocksError> {
    let candidates: Vec<_> = lookup_host(address)
        .await
        .map_err(SocksError::Transport)?
        .filter(|addr| network.accepts(addr))
        .collect();

    let mut last_error = None;
    for addr in candidates {
        debug!("Connecting to {} over {}", addr, network);
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true).map_err(SocksError::Transport)?;
                debug!("Connected to {}", addr);
                return Ok(stream);
            }
            Err(e) => {
                debug!("Connection to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(SocksError::Transport(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no suitable address found for {address} on {network}"),
        )
    })))
}

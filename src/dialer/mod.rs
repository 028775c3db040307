//! Dialers
//!
//! The `Dial` capability shared by the direct TCP dialer and the SOCKS4
//! dialer, so either can reach a proxy or be handed to a higher-level
//! transport.

pub mod direct;
pub mod socks4;
pub mod stream;

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::context::Context;
use crate::error::SocksError;

pub use direct::DirectDialer;
pub use socks4::{DialerConfig, Socks4Dialer};
pub use stream::SocksStream;

/// A bidirectional async byte stream
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Type-erased connection returned by a [`Dial`] implementation
pub type BoxedStream = Box<dyn AsyncStream>;

/// Connect to `address` on `network` under a cancellation context
#[async_trait]
pub trait Dial: Send + Sync {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> io::Result<BoxedStream>;
}

/// Stream networks accepted by the dialers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// IPv4 or IPv6
    Tcp,
    Tcp4,
    Tcp6,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Tcp4 => "tcp4",
            Network::Tcp6 => "tcp6",
        }
    }

    /// Whether `addr` belongs to this network's address family
    pub fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp => true,
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
        }
    }
}

impl FromStr for Network {
    type Err = SocksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            _ => Err(SocksError::Config("network not implemented".to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!("tcp".parse::<Network>().unwrap(), Network::Tcp);
        assert_eq!("tcp4".parse::<Network>().unwrap(), Network::Tcp4);
        assert_eq!("tcp6".parse::<Network>().unwrap(), Network::Tcp6);

        for network in ["udp", "unix", "TCP", ""] {
            let err = network.parse::<Network>().unwrap_err();
            assert_eq!(err.to_string(), "network not implemented");
        }
    }

    #[test]
    fn test_network_address_family() {
        let v4: SocketAddr = "127.0.0.1:1080".parse().unwrap();
        let v6: SocketAddr = "[::1]:1080".parse().unwrap();

        assert!(Network::Tcp.accepts(&v4) && Network::Tcp.accepts(&v6));
        assert!(Network::Tcp4.accepts(&v4) && !Network::Tcp4.accepts(&v6));
        assert!(Network::Tcp6.accepts(&v6) && !Network::Tcp6.accepts(&v4));
    }
}

//! Dialer Error Types
//!
//! `SocksError` is the cause of a failed handshake or dial. `DialError` wraps
//! it with the operation, network and endpoint context of the failing call.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::protocol::{ReplyCode, SocksAddress};

/// Coarse classification of a [`SocksError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unsupported network or command
    Config,
    /// Malformed `host:port` or out-of-range port
    TargetAddress,
    /// No IPv4 address found for a hostname
    Resolution,
    /// Proxy unreachable, or I/O with the proxy failed
    Transport,
    /// The proxy answered with a non-granted reply code
    Rejected,
    /// The caller cancelled the operation
    Cancelled,
    /// The caller's deadline elapsed
    DeadlineExceeded,
}

/// Cause of a failed SOCKS4 dial
#[derive(Debug, Error)]
pub enum SocksError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    TargetAddress(String),

    #[error("unable to resolve host: {host}")]
    Resolution {
        host: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Failure reaching the proxy
    #[error(transparent)]
    Transport(io::Error),

    /// Failure while exchanging the handshake with the proxy
    #[error(transparent)]
    Io(io::Error),

    #[error("{0}")]
    Rejected(ReplyCode),

    #[error("operation was cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl SocksError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SocksError::Config(_) => ErrorKind::Config,
            SocksError::TargetAddress(_) => ErrorKind::TargetAddress,
            SocksError::Resolution { .. } => ErrorKind::Resolution,
            SocksError::Transport(_) | SocksError::Io(_) => ErrorKind::Transport,
            SocksError::Rejected(_) => ErrorKind::Rejected,
            SocksError::Cancelled => ErrorKind::Cancelled,
            SocksError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    /// True for both caller cancellation and an elapsed deadline
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SocksError::Cancelled | SocksError::DeadlineExceeded)
    }

    /// Wrap an error returned by a proxy dial capability.
    ///
    /// A cancellation raised by the dial capability keeps its class instead
    /// of being reported as a transport failure.
    pub(crate) fn transport(err: io::Error) -> Self {
        let cancellation = match err.get_ref().and_then(|inner| inner.downcast_ref::<SocksError>()) {
            Some(SocksError::Cancelled) => Some(SocksError::Cancelled),
            Some(SocksError::DeadlineExceeded) => Some(SocksError::DeadlineExceeded),
            _ => None,
        };
        match cancellation {
            Some(err) => err,
            None => SocksError::Transport(err),
        }
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            SocksError::Config(_) | SocksError::TargetAddress(_) => io::ErrorKind::InvalidInput,
            SocksError::Resolution { .. } => io::ErrorKind::NotFound,
            SocksError::Transport(e) | SocksError::Io(e) => e.kind(),
            SocksError::Rejected(_) => io::ErrorKind::ConnectionRefused,
            SocksError::Cancelled => io::ErrorKind::Interrupted,
            SocksError::DeadlineExceeded => io::ErrorKind::TimedOut,
        }
    }
}

impl From<SocksError> for io::Error {
    fn from(err: SocksError) -> Self {
        match err {
            SocksError::Transport(e) | SocksError::Io(e) => e,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}

/// A failed dial, with the context of the call that failed.
///
/// `proxy` and `target` are `None` when the configured or requested address
/// could not be parsed.
#[derive(Debug, Error)]
#[error("{op} {network} {}->{}: {source}", DisplayAddr(.proxy), DisplayAddr(.target))]
pub struct DialError {
    pub op: &'static str,
    pub network: String,
    pub proxy: Option<SocksAddress>,
    pub target: Option<SocksAddress>,
    pub source: SocksError,
}

impl DialError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn is_cancellation(&self) -> bool {
        self.source.is_cancellation()
    }

    /// Drop the call context and keep the cause
    pub fn into_source(self) -> SocksError {
        self.source
    }
}

impl From<DialError> for io::Error {
    fn from(err: DialError) -> Self {
        let kind = err.source.io_kind();
        io::Error::new(kind, err)
    }
}

struct DisplayAddr<'a>(&'a Option<SocksAddress>);

impl fmt::Display for DisplayAddr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(addr) => addr.fmt(f),
            None => f.write_str("<nil>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Host, SocksAddress};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_dial_error_display() {
        let err = DialError {
            op: "socks connect",
            network: "tcp".to_string(),
            proxy: Some(SocksAddress::new(
                Host::Ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
                1080,
            )),
            target: Some(SocksAddress::new(Host::Name("example.com".to_string()), 80)),
            source: SocksError::Rejected(ReplyCode::Rejected),
        };

        assert_eq!(
            err.to_string(),
            "socks connect tcp 10.0.0.1:1080->example.com:80: request rejected or failed"
        );
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_dial_error_display_without_addresses() {
        let err = DialError {
            op: "socks bind",
            network: "udp".to_string(),
            proxy: None,
            target: None,
            source: SocksError::Config("network not implemented".to_string()),
        };

        assert_eq!(err.to_string(), "socks bind udp <nil>-><nil>: network not implemented");
    }

    #[test]
    fn test_transport_keeps_cancellation_class() {
        let io_err: io::Error = SocksError::Cancelled.into();
        assert_eq!(io_err.kind(), io::ErrorKind::Interrupted);
        assert_eq!(SocksError::transport(io_err).kind(), ErrorKind::Cancelled);

        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(SocksError::transport(refused).kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_io_error_conversion() {
        let err = DialError {
            op: "socks connect",
            network: "tcp".to_string(),
            proxy: None,
            target: None,
            source: SocksError::DeadlineExceeded,
        };
        let io_err: io::Error = err.into();

        assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);
        let inner = io_err.get_ref().and_then(|e| e.downcast_ref::<DialError>());
        assert!(inner.is_some_and(|e| e.is_cancellation()));
    }
}

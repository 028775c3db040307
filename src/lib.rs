//! socks4dialer
//!
//! SOCKS4 / SOCKS4a client dialer.
//!
//! Opens a TCP connection to a target through a SOCKS4 proxy and exposes it
//! as a generic `Dial` capability, so it can be composed into higher-level
//! transports. Handshakes are cancellable through a `Context` carrying a
//! cancellation token and a deadline.

pub mod address;
pub mod check;
pub mod config;
pub mod context;
pub mod dialer;
pub mod error;
pub mod protocol;

pub use config::Config;
pub use context::Context;
pub use dialer::{BoxedStream, Dial, DialerConfig, DirectDialer, Network, Socks4Dialer, SocksStream};
pub use error::{DialError, ErrorKind, SocksError};
pub use protocol::{Command, ReplyCode, Scheme, SocksAddress};

/// Result type for configuration and tooling code
pub type Result<T> = anyhow::Result<T>;

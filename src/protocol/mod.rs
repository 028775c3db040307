//! SOCKS4 Protocol Implementation
//!
//! This module contains the wire format and the client handshake for
//! SOCKS4 and SOCKS4a.

pub mod constants;
pub mod handler;
pub mod types;

pub use constants::*;
pub use handler::{build_request, parse_reply, Socks4Handler};
pub use types::*;

//! SOCKS4 Handshake Handler
//!
//! Encodes the client request, decodes the 8-byte server reply, and drives
//! the write-then-read exchange over any async byte stream.

use std::net::{IpAddr, Ipv4Addr};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::{Command, Host, ReplyCode, Scheme, SocksAddress};
use crate::error::SocksError;
use crate::protocol::constants::*;

/// Build a SOCKS4 / SOCKS4a request.
///
/// Layout: `VN CD DSTPORT(2) DSTIP(4) USERID NUL`, followed by
/// `HOST NUL` under SOCKS4a. The user id is always empty. Under SOCKS4a the
/// `ip` argument is ignored and the sentinel `0.0.0.1` is sent instead.
pub fn build_request(command: Command, scheme: Scheme, host: &str, port: u16, ip: Ipv4Addr) -> Bytes {
    let host_len = match scheme {
        Scheme::Socks4 => 0,
        Scheme::Socks4a => host.len() + 1,
    };
    let mut request = BytesMut::with_capacity(9 + host_len);

    request.put_u8(SOCKS4_VERSION);
    request.put_u8(command.code());
    request.put_u16(port);

    match scheme {
        Scheme::Socks4 => request.put_slice(&ip.octets()),
        Scheme::Socks4a => request.put_slice(&SOCKS4A_SENTINEL_IP),
    }

    // Empty user id
    request.put_u8(SOCKS4_NUL);

    if scheme == Scheme::Socks4a {
        request.put_slice(host.as_bytes());
        request.put_u8(SOCKS4_NUL);
    }

    request.freeze()
}

/// Parse the 8-byte SOCKS4 reply into the bound address.
///
/// The version byte is not checked. Any reply code other than "granted"
/// is returned as [`SocksError::Rejected`].
pub fn parse_reply(reply: &[u8; SOCKS4_REPLY_LEN]) -> Result<SocksAddress, SocksError> {
    let code = ReplyCode::from(reply[1]);
    if !code.is_granted() {
        return Err(SocksError::Rejected(code));
    }

    let port = u16::from_be_bytes([reply[2], reply[3]]);
    let ip = Ipv4Addr::new(reply[4], reply[5], reply[6], reply[7]);

    Ok(SocksAddress::new(Host::Ip(IpAddr::V4(ip)), port))
}

/// SOCKS4 handshake driver for the client side of a proxy connection
pub struct Socks4Handler<S> {
    stream: S,
}

impl<S> Socks4Handler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new SOCKS4 handler for the given stream
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Send a request built by [`build_request`]
    pub async fn send_request(&mut self, request: &[u8]) -> Result<(), SocksError> {
        self.stream.write_all(request).await.map_err(SocksError::Io)?;
        self.stream.flush().await.map_err(SocksError::Io)?;
        debug!("Sent SOCKS4 request ({} bytes)", request.len());
        Ok(())
    }

    /// Read the fixed-size reply and return the bound address
    pub async fn receive_reply(&mut self) -> Result<SocksAddress, SocksError> {
        let mut reply = [0u8; SOCKS4_REPLY_LEN];
        self.stream.read_exact(&mut reply).await.map_err(SocksError::Io)?;

        if reply[0] != SOCKS4_VERSION && reply[0] != SOCKS4_REPLY_VERSION {
            debug!("Ignoring unexpected SOCKS4 reply version: {}", reply[0]);
        }

        let bound = parse_reply(&reply);
        match &bound {
            Ok(addr) => debug!("SOCKS4 request granted, bound address {}", addr),
            Err(e) => debug!("SOCKS4 request failed: {}", e),
        }
        bound
    }

    /// Run one request/reply exchange. The write completes before the read starts.
    pub async fn handshake(&mut self, request: &[u8]) -> Result<SocksAddress, SocksError> {
        self.send_request(request).await?;
        self.receive_reply().await
    }

    /// Get the underlying stream back
    pub fn into_stream(self) -> S {
        self.stream
    }
}

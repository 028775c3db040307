//! Proxied Connection

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::BoxedStream;
use crate::protocol::SocksAddress;

/// A connection through a SOCKS4 proxy, after a granted handshake.
///
/// Reads and writes go straight to the proxy connection.
pub struct SocksStream {
    inner: BoxedStream,
    bound_addr: SocksAddress,
}

impl SocksStream {
    pub fn new(inner: BoxedStream, bound_addr: SocksAddress) -> Self {
        Self { inner, bound_addr }
    }

    /// Address assigned by the proxy for reaching the command target
    pub fn bound_addr(&self) -> &SocksAddress {
        &self.bound_addr
    }

    pub fn get_ref(&self) -> &BoxedStream {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut BoxedStream {
        &mut self.inner
    }

    /// Get the raw proxy connection back
    pub fn into_inner(self) -> BoxedStream {
        self.inner
    }
}

impl fmt::Debug for SocksStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocksStream")
            .field("bound_addr", &self.bound_addr)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for SocksStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for SocksStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}

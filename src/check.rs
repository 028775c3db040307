//! Proxy Connectivity Check
//!
//! Fetches an `http://` URL through a SOCKS4 dialer. Pointed at an
//! IP echo service this shows the address the target sees.

use std::time::Duration;

use anyhow::{anyhow, bail, Context as _};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper::header::{HeaderValue, ACCEPT, CONNECTION, HOST, USER_AGENT};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use tokio::time::timeout_at;
use tracing::{debug, info};
use url::Url;

use crate::address::host_port_from_url;
use crate::context::Context;
use crate::dialer::Socks4Dialer;
use crate::Result;

const HTTP_DEFAULT_PORT: u16 = 80;

/// Time limits of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckTimeouts {
    /// Proxy connect plus SOCKS handshake
    pub dial: Duration,
    /// The whole check, dial included
    pub total: Duration,
}

/// GET `target` through `dialer` and return the response body.
///
/// The dial runs under `timeouts.dial`, nested inside `timeouts.total`,
/// which bounds the whole exchange.
pub async fn fetch_through_proxy(
    dialer: &Socks4Dialer,
    target: &str,
    timeouts: CheckTimeouts,
) -> Result<Vec<u8>> {
    let url = Url::parse(target).with_context(|| format!("Invalid url: {}", target))?;
    if url.scheme() != "http" {
        bail!("Unsupported url scheme: {} (only http is supported)", url.scheme());
    }

    let address = host_port_from_url(&url, HTTP_DEFAULT_PORT)
        .ok_or_else(|| anyhow!("Url has no host: {}", target))?;
    let request = build_request(&url)?;

    let check_ctx = Context::with_timeout(timeouts.total);
    let dial_ctx = check_ctx.clone().timeout(timeouts.dial);

    let stream = dialer
        .dial_context(&dial_ctx, "tcp", &address)
        .await
        .with_context(|| format!("Failed to connect to {} through proxy", address))?;
    info!(
        "Connected to {} through {} (bound address {})",
        address,
        dialer.config().proxy_address,
        stream.bound_addr()
    );

    let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
        .await
        .with_context(|| format!("HTTP handshake with {} failed", address))?;

    let exchange = async move {
        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        Ok::<_, hyper::Error>((status, body))
    };

    // The connection future drives the socket; it ends once the response
    // is read, since the request asks for `Connection: close`.
    let exchange = async { tokio::join!(exchange, connection) };
    let (result, connection_result) = match check_ctx.get_deadline() {
        Some(deadline) => timeout_at(deadline, exchange)
            .await
            .map_err(|_| anyhow!("Timed out waiting for response from {}", address))?,
        None => exchange.await,
    };

    if let Err(e) = connection_result {
        debug!("HTTP connection to {} ended: {}", address, e);
    }

    let (status, body) = result.with_context(|| format!("HTTP exchange with {} failed", address))?;
    debug!("Received {} {} ({} bytes) from {}", status.as_u16(), url, body.len(), address);

    if !status.is_success() {
        bail!("Unexpected HTTP status {} from {}", status, url);
    }

    Ok(body.to_vec())
}

fn build_request(url: &Url) -> Result<Request<Empty<Bytes>>> {
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    let host = url.host_str().unwrap_or_default();
    let host_header = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(HOST, HeaderValue::from_str(&host_header)?)
        .header(USER_AGENT, concat!("socks4-check/", env!("CARGO_PKG_VERSION")))
        .header(ACCEPT, "*/*")
        .header(CONNECTION, "close")
        .body(Empty::<Bytes>::new())?;

    Ok(request)
}

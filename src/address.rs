//! Address Parsing and Resolution
//!
//! `host:port` splitting with SOCKS port rules, and IPv4 lookup for the
//! SOCKS4 scheme, where the client resolves the target itself.

use std::io;
use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::SocksError;

/// Hostname resolution capability
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Look up all addresses of `host`
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the system's name service
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Split `host:port` into its parts.
///
/// IPv6 hosts must be bracketed (`[::1]:80`). The host may not contain NUL
/// bytes. The port must be numeric and within `1..=65535`.
pub fn split_host_port(address: &str) -> Result<(String, u16), SocksError> {
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, rest) = rest
            .split_once(']')
            .ok_or_else(|| invalid_address(address, "missing ']' in address"))?;
        let port = rest
            .strip_prefix(':')
            .ok_or_else(|| invalid_address(address, "missing port in address"))?;
        (host, port)
    } else {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| invalid_address(address, "missing port in address"))?;
        if host.contains(':') {
            return Err(invalid_address(address, "too many colons in address"));
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(invalid_address(address, "missing host in address"));
    }

    // A NUL would terminate the SOCKS4a hostname field early
    if host.contains('\0') {
        return Err(invalid_address(address, "invalid NUL in host"));
    }

    let port_num: u32 = port
        .parse()
        .map_err(|_| invalid_address(address, &format!("invalid port {port:?}")))?;
    if !(1..=0xffff).contains(&port_num) {
        return Err(invalid_address(address, &format!("port number out of range {port}")));
    }

    Ok((host.to_string(), port_num as u16))
}

/// Join a host and port, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// `host:port` of a URL's authority, falling back to `default_port`
pub fn host_port_from_url(url: &Url, default_port: u16) -> Option<String> {
    let host = match url.host()? {
        url::Host::Domain(domain) => domain.to_string(),
        url::Host::Ipv4(ip) => ip.to_string(),
        url::Host::Ipv6(ip) => ip.to_string(),
    };
    if host.is_empty() {
        return None;
    }
    Some(join_host_port(&host, url.port().unwrap_or(default_port)))
}

/// Resolve `host` to its first IPv4 address.
///
/// IPv4 literals are returned as-is without a lookup.
pub async fn resolve_ipv4(resolver: &dyn Resolve, host: &str) -> Result<Ipv4Addr, SocksError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }

    let addrs = resolver.lookup(host).await.map_err(|e| SocksError::Resolution {
        host: host.to_string(),
        source: Some(e),
    })?;

    let ip = first_ipv4(&addrs).ok_or_else(|| SocksError::Resolution {
        host: host.to_string(),
        source: None,
    })?;

    debug!("Resolved {} to {}", host, ip);
    Ok(ip)
}

fn first_ipv4(addrs: &[IpAddr]) -> Option<Ipv4Addr> {
    addrs.iter().find_map(|ip| match ip {
        IpAddr::V4(v4) => Some(*v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    })
}

fn invalid_address(address: &str, reason: &str) -> SocksError {
    SocksError::TargetAddress(format!("address {address}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::net::Ipv6Addr;

    struct FixedResolver(Vec<IpAddr>);

    #[async_trait]
    impl Resolve for FixedResolver {
        async fn lookup(&self, _host: &str) -> io::Result<Vec<IpAddr>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_split_and_join_round_trip() {
        for (host, port) in [("example.com", 1u16), ("10.0.0.1", 80), ("::1", 8080), ("proxy", 65535)] {
            let joined = join_host_port(host, port);
            let (split_host, split_port) = split_host_port(&joined).unwrap();
            assert_eq!(split_host, host);
            assert_eq!(split_port, port);
        }
    }

    #[test]
    fn test_split_rejects_bad_ports() {
        for address in ["example.com:0", "example.com:65536", "example.com:http", "example.com:-1"] {
            let err = split_host_port(address).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TargetAddress, "{address}");
        }
    }

    #[test]
    fn test_split_rejects_malformed_addresses() {
        for address in ["example.com", "::1:80", "[::1]80", "[::1:80", ":80", ""] {
            assert!(split_host_port(address).is_err(), "{address}");
        }
        let err = split_host_port("example.com:70000").unwrap_err();
        assert_eq!(err.to_string(), "address example.com:70000: port number out of range 70000");
    }

    #[test]
    fn test_split_rejects_nul_in_host() {
        for address in ["evil\0GET / HTTP/1.0\r\n:80", "\0:80", "[::1\0]:80"] {
            let err = split_host_port(address).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TargetAddress);
            assert!(err.to_string().ends_with("invalid NUL in host"));
        }
    }

    #[test]
    fn test_host_port_from_url() {
        let url = Url::parse("socks4://127.0.0.1:9050").unwrap();
        assert_eq!(host_port_from_url(&url, 1080).as_deref(), Some("127.0.0.1:9050"));

        let url = Url::parse("socks4a://proxy.local").unwrap();
        assert_eq!(host_port_from_url(&url, 1080).as_deref(), Some("proxy.local:1080"));

        let url = Url::parse("http://[::1]/ip").unwrap();
        assert_eq!(host_port_from_url(&url, 80).as_deref(), Some("[::1]:80"));
    }

    #[tokio::test]
    async fn test_resolve_picks_first_ipv4() {
        let resolver = FixedResolver(vec![
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 6)),
        ]);

        let ip = resolve_ipv4(&resolver, "mixed.example").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(203, 0, 113, 5));
    }

    #[tokio::test]
    async fn test_resolve_accepts_mapped_ipv4() {
        let mapped = Ipv4Addr::new(198, 51, 100, 1).to_ipv6_mapped();
        let resolver = FixedResolver(vec![IpAddr::V6(mapped)]);

        let ip = resolve_ipv4(&resolver, "mapped.example").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(198, 51, 100, 1));
    }

    #[tokio::test]
    async fn test_resolve_fails_without_ipv4() {
        let resolver = FixedResolver(vec![IpAddr::V6(Ipv6Addr::LOCALHOST)]);

        let err = resolve_ipv4(&resolver, "v6only.example").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert_eq!(err.to_string(), "unable to resolve host: v6only.example");
    }

    #[tokio::test]
    async fn test_resolve_literal_skips_lookup() {
        let resolver = FixedResolver(vec![]);
        let ip = resolve_ipv4(&resolver, "192.0.2.44").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 0, 2, 44));
    }
}

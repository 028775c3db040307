//! SOCKS4 Protocol Types

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::address::{join_host_port, split_host_port};
use crate::error::SocksError;
use crate::protocol::constants::*;

/// SOCKS4 Commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Active-open forward proxy connection
    Connect,
    /// Passive-open forward proxy connection
    Bind,
}

impl Command {
    /// Get the command code for this command
    pub fn code(self) -> u8 {
        match self {
            Command::Connect => SOCKS4_CMD_CONNECT,
            Command::Bind => SOCKS4_CMD_BIND,
        }
    }

    /// Operation label used in dial errors
    pub fn label(self) -> &'static str {
        match self {
            Command::Connect => "socks connect",
            Command::Bind => "socks bind",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = SocksError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            SOCKS4_CMD_CONNECT => Ok(Command::Connect),
            SOCKS4_CMD_BIND => Ok(Command::Bind),
            _ => Err(SocksError::Config(format!("command not implemented: {code}"))),
        }
    }
}

impl FromStr for Command {
    type Err = SocksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "connect" => Ok(Command::Connect),
            "bind" => Ok(Command::Bind),
            _ => Err(SocksError::Config(format!("command not implemented: {s}"))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who resolves the target hostname
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// The client resolves the target to IPv4 before sending the request
    Socks4,
    /// The proxy resolves; the hostname travels in the request
    Socks4a,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Socks4 => SCHEME_SOCKS4,
            Scheme::Socks4a => SCHEME_SOCKS4A,
        }
    }

    /// Whether the client must resolve the target itself
    pub fn resolves_locally(self) -> bool {
        self == Scheme::Socks4
    }
}

impl FromStr for Scheme {
    type Err = SocksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            SCHEME_SOCKS4 => Ok(Scheme::Socks4),
            SCHEME_SOCKS4A => Ok(Scheme::Socks4a),
            _ => Err(SocksError::Config(format!("proxy scheme not supported: {s}"))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SOCKS4 reply code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyCode {
    Granted,
    Rejected,
    IdentdUnreachable,
    IdentdMismatch,
    Unknown(u8),
}

impl ReplyCode {
    /// Get the wire code
    pub fn code(self) -> u8 {
        match self {
            ReplyCode::Granted => SOCKS4_REPLY_GRANTED,
            ReplyCode::Rejected => SOCKS4_REPLY_REJECTED,
            ReplyCode::IdentdUnreachable => SOCKS4_REPLY_IDENTD_UNREACHABLE,
            ReplyCode::IdentdMismatch => SOCKS4_REPLY_IDENTD_MISMATCH,
            ReplyCode::Unknown(code) => code,
        }
    }

    pub fn is_granted(self) -> bool {
        self == ReplyCode::Granted
    }
}

impl From<u8> for ReplyCode {
    fn from(code: u8) -> Self {
        match code {
            SOCKS4_REPLY_GRANTED => ReplyCode::Granted,
            SOCKS4_REPLY_REJECTED => ReplyCode::Rejected,
            SOCKS4_REPLY_IDENTD_UNREACHABLE => ReplyCode::IdentdUnreachable,
            SOCKS4_REPLY_IDENTD_MISMATCH => ReplyCode::IdentdMismatch,
            other => ReplyCode::Unknown(other),
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyCode::Granted => f.write_str("request granted"),
            ReplyCode::Rejected => f.write_str("request rejected or failed"),
            ReplyCode::IdentdUnreachable => f.write_str(
                "request rejected because SOCKS server cannot connect to identd on the client",
            ),
            ReplyCode::IdentdMismatch => f.write_str(
                "request rejected because the client program and identd report different user-ids",
            ),
            ReplyCode::Unknown(code) => write!(f, "unknown code: {code}"),
        }
    }
}

/// Host part of a SOCKS address: either a name or an IP, never both
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    Name(String),
    Ip(IpAddr),
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Name(name) => f.write_str(name),
            Host::Ip(ip) => ip.fmt(f),
        }
    }
}

/// A SOCKS endpoint: proxy, command target, or the address bound by the proxy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocksAddress {
    pub host: Host,
    pub port: u16,
}

impl SocksAddress {
    pub fn new(host: Host, port: u16) -> Self {
        Self { host, port }
    }

    /// Parse a `host:port` string. IP literals become [`Host::Ip`].
    pub fn parse(address: &str) -> Result<Self, SocksError> {
        let (host, port) = split_host_port(address)?;
        let host = match host.parse::<IpAddr>() {
            Ok(ip) => Host::Ip(ip),
            Err(_) => Host::Name(host),
        };
        Ok(Self { host, port })
    }

    /// Fully-qualified domain name, if this is a named address
    pub fn name(&self) -> Option<&str> {
        match &self.host {
            Host::Name(name) => Some(name),
            Host::Ip(_) => None,
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        match self.host {
            Host::Ip(ip) => Some(ip),
            Host::Name(_) => None,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Network name, as reported by the proxy-facing side
    pub fn network(&self) -> &'static str {
        "socks"
    }
}

impl fmt::Display for SocksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_host_port(&self.host.to_string(), self.port))
    }
}

impl FromStr for SocksAddress {
    type Err = SocksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SocksAddress::parse(s)
    }
}

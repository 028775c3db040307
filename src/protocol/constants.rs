//! SOCKS4 Protocol Constants

// SOCKS4 Protocol Version
pub const SOCKS4_VERSION: u8 = 0x04;

// Some servers answer with a zero version byte
pub const SOCKS4_REPLY_VERSION: u8 = 0x00;

// SOCKS4 Commands
pub const SOCKS4_CMD_CONNECT: u8 = 0x01;
pub const SOCKS4_CMD_BIND: u8 = 0x02;

// Reply Codes
pub const SOCKS4_REPLY_GRANTED: u8 = 90;
pub const SOCKS4_REPLY_REJECTED: u8 = 91;
pub const SOCKS4_REPLY_IDENTD_UNREACHABLE: u8 = 92;
pub const SOCKS4_REPLY_IDENTD_MISMATCH: u8 = 93;

// Reply length: VN CD DSTPORT(2) DSTIP(4)
pub const SOCKS4_REPLY_LEN: usize = 8;

// SOCKS4a: DSTIP 0.0.0.x (x != 0) means "resolve the hostname that follows"
pub const SOCKS4A_SENTINEL_IP: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

// Field terminator for USERID and hostname
pub const SOCKS4_NUL: u8 = 0x00;

// URL schemes
pub const SCHEME_SOCKS4: &str = "socks4";
pub const SCHEME_SOCKS4A: &str = "socks4a";

// Conventional SOCKS port
pub const SOCKS_DEFAULT_PORT: u16 = 1080;

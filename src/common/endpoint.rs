//! Endpoint type for remote destinations
//!
//! The agent-channel wire format only ever carries IPv4 host + port, so
//! an endpoint is exactly that: 4 octets and a 16-bit port, both in
//! network byte order on the wire.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::{Error, Result};

/// Length of an encoded endpoint on the wire: host(4) + port(2).
pub const ENCODED_LEN: usize = 6;

/// An IPv4 destination: host + port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Endpoint {
    /// Create from host and port.
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    /// Decode from exactly six wire bytes: `host(4) || port(2)`,
    /// big-endian.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ENCODED_LEN {
            return Err(Error::InvalidAddress(format!(
                "address record too short: {} bytes",
                bytes.len()
            )));
        }

        let host = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let port = u16::from_be_bytes([bytes[4], bytes[5]]);
        Ok(Self { host, port })
    }

    /// Encode to the six-byte wire form.
    pub fn encode(&self) -> [u8; ENCODED_LEN] {
        let host = self.host.octets();
        let port = self.port.to_be_bytes();
        [host[0], host[1], host[2], host[3], port[0], port[1]]
    }

    /// View as a socket address for connect/send calls.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(*addr.ip(), addr.port())
    }
}

impl TryFrom<SocketAddr> for Endpoint {
    type Error = Error;

    fn try_from(addr: SocketAddr) -> Result<Self> {
        match addr {
            SocketAddr::V4(v4) => Ok(Self::from(v4)),
            SocketAddr::V6(v6) => Err(Error::InvalidAddress(format!(
                "IPv6 address not representable: {v6}"
            ))),
        }
    }
}

//! Transport layer
//!
//! Establishes the lowest-level remote connections (TCP, UDP). No
//! framing, no protocol parsing; this layer only deals with raw byte
//! transport. The relay core consumes it through the [`Transport`]
//! trait so tests can substitute loopback or in-memory endpoints.

mod tcp;
mod udp;

pub use tcp::TcpTransport;
pub use udp::DatagramSocket;

use async_trait::async_trait;

use crate::common::{Endpoint, Result, Stream};

/// Opener for connection-oriented remote transports.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to a remote endpoint.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Stream>;
}

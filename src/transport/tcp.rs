//! TCP Transport implementation

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::common::{Endpoint, Result, Stream};

use super::Transport;

/// TCP transport - raw TCP connections
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Stream> {
        let stream = TcpStream::connect(endpoint.socket_addr()).await?;

        // Disable Nagle's algorithm for lower latency
        stream.set_nodelay(true)?;

        Ok(Box::new(stream))
    }
}

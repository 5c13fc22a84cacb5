//! UDP transport implementation
//!
//! UDP is connectionless: one socket bound to an ephemeral local port
//! serves arbitrarily many remote peers, addressed per datagram.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use tokio::net::UdpSocket;

use crate::common::{Endpoint, Result};

/// Shared datagram endpoint for the datagram relay engine.
pub struct DatagramSocket {
    socket: UdpSocket,
}

impl DatagramSocket {
    /// Bind to an ephemeral IPv4 port.
    pub async fn bind_ephemeral() -> Result<Self> {
        let socket =
            UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await?;
        Ok(Self { socket })
    }

    /// The locally bound endpoint.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        Endpoint::try_from(self.socket.local_addr()?)
    }

    /// Send one datagram to `endpoint`. A transient would-block send is
    /// absorbed by the runtime; other failures surface.
    pub async fn send_to(&self, data: &[u8], endpoint: &Endpoint) -> Result<usize> {
        Ok(self.socket.send_to(data, endpoint.socket_addr()).await?)
    }

    /// Receive one datagram, returning the payload length and the
    /// sender's address.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(self.socket.recv_from(buf).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_assigns_port() {
        let socket = DatagramSocket::bind_ephemeral().await.unwrap();
        let endpoint = socket.local_endpoint().unwrap();
        assert_ne!(endpoint.port, 0);
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let a = DatagramSocket::bind_ephemeral().await.unwrap();
        let b = DatagramSocket::bind_ephemeral().await.unwrap();

        let mut dest = b.local_endpoint().unwrap();
        dest.host = Ipv4Addr::LOCALHOST;
        a.send_to(b"ping", &dest).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = b.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
        assert_eq!(from.port(), a.local_endpoint().unwrap().port);
    }
}

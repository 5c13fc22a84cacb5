//! Datagram relay engine
//!
//! Connectionless steady state: one shared UDP socket serves arbitrarily
//! many peers, so every frame on the agent channel carries a six-byte
//! address record ahead of the payload, in both directions. There is no
//! handshake and no sentinel; both pumps start immediately.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::channel::{FramedReader, FramedWriter};
use crate::common::{Endpoint, ENDPOINT_LEN};
use crate::error::Error;
use crate::transport::DatagramSocket;

use super::{RelayState, SessionEnd, CHUNK_LIMIT};

/// Two-pump relay over a shared datagram socket.
pub struct DatagramRelay {
    chunk_limit: usize,
}

impl DatagramRelay {
    pub fn new() -> Self {
        Self {
            chunk_limit: CHUNK_LIMIT,
        }
    }

    /// Override the receive buffer size. Test hook and tuning knob.
    pub fn with_chunk_limit(mut self, chunk_limit: usize) -> Self {
        self.chunk_limit = chunk_limit;
        self
    }

    /// Run the session to completion.
    pub async fn run<R, W>(
        &self,
        mut agent_reader: FramedReader<R>,
        mut agent_writer: FramedWriter<W>,
        socket: DatagramSocket,
    ) -> SessionEnd
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let state = RelayState::new();

        let agent_to_remote = async {
            let result = loop {
                let frame = tokio::select! {
                    res = agent_reader.read_frame() => match res {
                        Ok(frame) => frame,
                        Err(e) => break Err(e),
                    },
                    _ = state.wait_shutdown() => break Ok(()),
                };

                if frame.len() < ENDPOINT_LEN {
                    break Err(Error::Protocol(format!(
                        "datagram frame shorter than address record: {} bytes",
                        frame.len()
                    )));
                }

                let endpoint = match Endpoint::decode(&frame[..ENDPOINT_LEN]) {
                    Ok(endpoint) => endpoint,
                    Err(e) => break Err(e),
                };
                let payload = &frame[ENDPOINT_LEN..];

                debug!("agent -> {}: {} bytes", endpoint, payload.len());

                // Zero-length datagrams are valid and forwarded as-is.
                if let Err(e) = socket.send_to(payload, &endpoint).await {
                    break Err(e);
                }
            };

            state.shutdown();
            result
        };

        let remote_to_agent = async {
            let mut buf = vec![0u8; self.chunk_limit];
            let result = loop {
                let (n, from) = tokio::select! {
                    res = socket.recv_from(&mut buf) => match res {
                        Ok(received) => received,
                        Err(e) => break Err(e),
                    },
                    _ = state.wait_shutdown() => break Ok(()),
                };

                let endpoint = match Endpoint::try_from(from) {
                    Ok(endpoint) => endpoint,
                    Err(_) => {
                        // The wire format only carries IPv4 sources.
                        warn!("dropping datagram from non-IPv4 source {}", from);
                        continue;
                    }
                };

                debug!("{} -> agent: {} bytes", endpoint, n);

                let mut out = Vec::with_capacity(ENDPOINT_LEN + n);
                out.extend_from_slice(&endpoint.encode());
                out.extend_from_slice(&buf[..n]);

                if let Err(e) = agent_writer.write_frame(&out).await {
                    break Err(e);
                }
            };

            state.shutdown();
            let _ = agent_writer.shutdown().await;
            result
        };

        let (agent_result, remote_result) = tokio::join!(agent_to_remote, remote_to_agent);

        let end = SessionEnd::from_pumps(agent_result, remote_result);
        if !end.is_clean() {
            warn!("datagram relay ended with failure: {:?}", end);
        }
        end
    }
}

impl Default for DatagramRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::FramedChannel;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    async fn loopback_peer() -> (UdpSocket, Endpoint) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::new(Ipv4Addr::LOCALHOST, socket.local_addr().unwrap().port());
        (socket, endpoint)
    }

    #[tokio::test]
    async fn test_relays_datagrams_in_both_directions() {
        let (peer, peer_endpoint) = loopback_peer().await;

        let socket = DatagramSocket::bind_ephemeral().await.unwrap();
        let relay_port = socket.local_endpoint().unwrap().port;

        let (agent_near, agent_far) = tokio::io::duplex(4096);
        let relay = tokio::spawn(async move {
            let (reader, writer) = FramedChannel::new(agent_near).split();
            DatagramRelay::new().run(reader, writer, socket).await
        });

        let (mut agent_reader, mut agent_writer) = FramedChannel::new(agent_far).split();

        // Agent frame: host(4) || port(2) || "payload".
        let mut frame = peer_endpoint.encode().to_vec();
        frame.extend_from_slice(b"payload");
        agent_writer.write_frame(&frame).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"payload");
        assert_eq!(from.port(), relay_port);

        // Reply from the peer comes back framed with its source address.
        peer.send_to(b"reply", ("127.0.0.1", relay_port))
            .await
            .unwrap();
        let reply = agent_reader.read_frame().await.unwrap();
        assert_eq!(&reply[..ENDPOINT_LEN], &peer_endpoint.encode());
        assert_eq!(&reply[ENDPOINT_LEN..], b"reply");

        // Agent channel closure ends the session cleanly.
        drop(agent_writer);
        drop(agent_reader);
        let end = tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .expect("relay should terminate")
            .unwrap();
        assert!(end.is_clean());
    }

    #[tokio::test]
    async fn test_short_address_record_is_protocol_error() {
        let socket = DatagramSocket::bind_ephemeral().await.unwrap();
        let (agent_near, agent_far) = tokio::io::duplex(4096);

        let relay = tokio::spawn(async move {
            let (reader, writer) = FramedChannel::new(agent_near).split();
            DatagramRelay::new().run(reader, writer, socket).await
        });

        let (_agent_reader, mut agent_writer) = FramedChannel::new(agent_far).split();
        agent_writer.write_frame(&[127, 0, 0, 1]).await.unwrap();

        let end = tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .expect("relay should terminate")
            .unwrap();
        assert!(matches!(end, SessionEnd::AgentToRemote(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_zero_length_payload_is_forwarded() {
        let (peer, peer_endpoint) = loopback_peer().await;

        let socket = DatagramSocket::bind_ephemeral().await.unwrap();
        let (agent_near, agent_far) = tokio::io::duplex(4096);

        let _relay = tokio::spawn(async move {
            let (reader, writer) = FramedChannel::new(agent_near).split();
            DatagramRelay::new().run(reader, writer, socket).await
        });

        let (_agent_reader, mut agent_writer) = FramedChannel::new(agent_far).split();
        agent_writer
            .write_frame(&peer_endpoint.encode())
            .await
            .unwrap();

        let mut buf = [0u8; 16];
        let (n, _) = tokio::time::timeout(Duration::from_secs(5), peer.recv_from(&mut buf))
            .await
            .expect("zero-length datagram should arrive")
            .unwrap();
        assert_eq!(n, 0);
    }
}

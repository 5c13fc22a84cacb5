//! Connection-establishment handshake
//!
//! The first thing on the agent channel is a six-byte address record:
//! IPv4 host then big-endian port, unframed. The relay connects to that
//! destination and answers with a single unframed sentinel byte before
//! any relaying starts.
//!
//! State machine: AwaitingAddress -> Connecting -> Connected | Failed.
//! Both failure states are terminal for the whole process; there is no
//! retry across the handshake.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::channel::{FramedReader, FramedWriter};
use crate::common::{Endpoint, Error, Stream, ENDPOINT_LEN};
use crate::transport::Transport;

/// Sentinel byte: remote connection established.
pub const REPLY_CONNECTED: u8 = 0xF1;

/// Sentinel byte: remote connection failed, session never starts.
pub const REPLY_FAILED: u8 = 0xF0;

/// Terminal handshake outcomes, kept apart so a supervising process can
/// tell agent-channel failures from connect failures by exit status.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The agent channel itself failed while reading the address record
    /// or writing the sentinel. No sentinel reaches the peer.
    #[error("agent channel failed during handshake: {0}")]
    Agent(#[source] Error),

    /// The remote destination could not be reached. The failure
    /// sentinel has been written and the agent channel shut down.
    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        #[source]
        source: Error,
    },
}

/// Run the handshake: read the destination, connect, report the outcome.
///
/// On success the sentinel [`REPLY_CONNECTED`] has been written and the
/// connected stream is returned alongside the connection record.
pub async fn establish<R, W>(
    agent_reader: &mut FramedReader<R>,
    agent_writer: &mut FramedWriter<W>,
    transport: &dyn Transport,
) -> Result<(Endpoint, Stream), HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // AwaitingAddress
    let record = agent_reader
        .read_exact(ENDPOINT_LEN)
        .await
        .map_err(HandshakeError::Agent)?;
    let endpoint = Endpoint::decode(&record).map_err(HandshakeError::Agent)?;

    debug!("connecting to {}", endpoint);

    // Connecting
    match transport.connect(&endpoint).await {
        Ok(stream) => {
            agent_writer
                .write_all(&[REPLY_CONNECTED])
                .await
                .map_err(HandshakeError::Agent)?;
            info!("connected to {}", endpoint);
            Ok((endpoint, stream))
        }
        Err(source) => {
            warn!("could not connect to {}: {}", endpoint, source);
            // Best effort: the peer may already be gone.
            let _ = agent_writer.write_all(&[REPLY_FAILED]).await;
            let _ = agent_writer.shutdown().await;
            Err(HandshakeError::Connect { endpoint, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::FramedChannel;
    use crate::transport::TcpTransport;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_handshake_success_emits_connected_sentinel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (agent_near, agent_far) = tokio::io::duplex(256);
        let (mut reader, mut writer) = FramedChannel::new(agent_near).split();
        let (mut peer_reader, mut peer_writer) = FramedChannel::new(agent_far).split();

        // The managing process sends host(4) || port(2).
        let mut record = vec![127, 0, 0, 1];
        record.extend_from_slice(&port.to_be_bytes());
        peer_writer.write_all(&record).await.unwrap();

        let transport = TcpTransport::new();
        let (endpoint, _stream) = establish(&mut reader, &mut writer, &transport)
            .await
            .unwrap();

        assert_eq!(endpoint.host, Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(endpoint.port, port);

        let sentinel = peer_reader.read_exact(1).await.unwrap();
        assert_eq!(sentinel[0], REPLY_CONNECTED);

        // The listener really saw the connection.
        let (_conn, _addr) = listener.accept().await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_failure_emits_failed_sentinel() {
        // Bind then drop to get a port with no listener behind it.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let (agent_near, agent_far) = tokio::io::duplex(256);
        let (mut reader, mut writer) = FramedChannel::new(agent_near).split();
        let (mut peer_reader, mut peer_writer) = FramedChannel::new(agent_far).split();

        let mut record = vec![127, 0, 0, 1];
        record.extend_from_slice(&port.to_be_bytes());
        peer_writer.write_all(&record).await.unwrap();

        let transport = TcpTransport::new();
        let err = establish(&mut reader, &mut writer, &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::Connect { .. }));

        let sentinel = peer_reader.read_exact(1).await.unwrap();
        assert_eq!(sentinel[0], REPLY_FAILED);

        // Channel is shut down after the failure sentinel.
        assert!(peer_reader.read_exact(1).await.is_err());
    }

    #[tokio::test]
    async fn test_handshake_agent_closure_writes_no_sentinel() {
        let (agent_near, agent_far) = tokio::io::duplex(256);
        let (mut reader, mut writer) = FramedChannel::new(agent_near).split();
        let (mut peer_reader, mut peer_writer) = FramedChannel::new(agent_far).split();

        // Partial record, then closure.
        peer_writer.write_all(&[127, 0, 0]).await.unwrap();
        peer_writer.shutdown().await.unwrap();
        drop(peer_writer);

        let transport = TcpTransport::new();
        let err = establish(&mut reader, &mut writer, &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::Agent(_)));

        // Nothing was written back before the channel went away.
        drop(writer);
        drop(reader);
        assert!(matches!(
            peer_reader.read_exact(1).await,
            Err(Error::ConnectionClosed)
        ));
    }
}

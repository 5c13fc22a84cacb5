//! Stream relay engine
//!
//! Connection-oriented steady state: frames from the agent channel are
//! unwrapped and written raw to the remote stream; raw remote bytes are
//! wrapped in frames and written back. Runs until either side closes or
//! fails.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::channel::{FramedChannel, FramedReader, FramedWriter};
use crate::common::Stream;
use crate::error::Error;

use super::{RelayState, SessionEnd, CHUNK_LIMIT};

/// Two-pump relay for a connection-oriented remote transport.
pub struct StreamRelay {
    chunk_limit: usize,
}

impl StreamRelay {
    pub fn new() -> Self {
        Self {
            chunk_limit: CHUNK_LIMIT,
        }
    }

    /// Override the remote-side read size. Test hook and tuning knob.
    pub fn with_chunk_limit(mut self, chunk_limit: usize) -> Self {
        self.chunk_limit = chunk_limit;
        self
    }

    /// Run the session to completion. The agent halves are taken
    /// separately because the handshake already split the channel. The
    /// remote stream is closed first, then the agent channel, by
    /// whichever pump exits first on its own side.
    pub async fn run<R, W>(
        &self,
        mut agent_reader: FramedReader<R>,
        mut agent_writer: FramedWriter<W>,
        remote: Stream,
    ) -> SessionEnd
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let (mut remote_reader, mut remote_writer) = FramedChannel::new(remote).split();
        let state = RelayState::new();

        let agent_to_remote = async {
            let result = loop {
                let payload = tokio::select! {
                    res = agent_reader.read_frame() => match res {
                        Ok(payload) => payload,
                        Err(e) => break Err(e),
                    },
                    _ = state.wait_shutdown() => break Ok(()),
                };

                debug!("agent -> remote: {} bytes", payload.len());

                // A zero-length payload is a valid frame and a no-op
                // write, never an end-of-session signal.
                if let Err(e) = remote_writer.write_all(&payload).await {
                    break Err(e);
                }
            };

            state.shutdown();
            let _ = remote_writer.shutdown().await;
            result
        };

        let remote_to_agent = async {
            let result = loop {
                let data = tokio::select! {
                    res = remote_reader.read_up_to(self.chunk_limit) => match res {
                        Ok(data) => data,
                        Err(e) => break Err(e),
                    },
                    _ = state.wait_shutdown() => break Ok(()),
                };

                debug!("remote -> agent: {} bytes", data.len());

                if let Err(e) = agent_writer.write_frame(&data).await {
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
            warn!("stream relay ended with failure: {:?}", end);
        }
        end
    }
}

impl Default for StreamRelay {
    fn default() -> Self {
        Self::new()
    }
}

//! Relay engines
//!
//! Steady-state byte movement after (for streams) the handshake. Each
//! session runs exactly two pumps, one per direction, sharing nothing
//! but a running flag: each pump owns reads from one source and writes
//! to one sink, so no lock guards the channels themselves.

mod datagram;
mod stream;

pub use datagram::DatagramRelay;
pub use stream::StreamRelay;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::Error;

/// Fixed read size for remote-side reads, in both engines.
pub const CHUNK_LIMIT: usize = 2048;

/// Shared session state: a one-writer-wins running flag.
///
/// Whichever pump fails first flips it; the other observes the change
/// at its next loop head and exits without further I/O. Lost updates
/// are harmless because every writer stores the same value.
pub struct RelayState {
    running: AtomicBool,
    notify: Notify,
}

impl RelayState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(true),
            notify: Notify::new(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// End the session. Idempotent.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolve once the session has been shut down.
    pub async fn wait_shutdown(&self) {
        loop {
            // Register before checking so a shutdown between the check
            // and the await cannot be missed.
            let notified = self.notify.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

/// How a relay session ended, attributed to the pump that ended it.
#[derive(Debug)]
pub enum SessionEnd {
    /// Both pumps terminated cleanly (peer closure, no error).
    Clean,
    /// The agent-to-remote pump hit a terminal error.
    AgentToRemote(Error),
    /// The remote-to-agent pump hit a terminal error.
    RemoteToAgent(Error),
}

impl SessionEnd {
    pub fn is_clean(&self) -> bool {
        matches!(self, SessionEnd::Clean)
    }

    /// Fold the two pump results into one session outcome. Clean
    /// closure does not count as a failure.
    fn from_pumps(
        agent_to_remote: Result<(), Error>,
        remote_to_agent: Result<(), Error>,
    ) -> Self {
        if let Err(e) = agent_to_remote {
            if !e.is_closed() {
                return SessionEnd::AgentToRemote(e);
            }
        }
        if let Err(e) = remote_to_agent {
            if !e.is_closed() {
                return SessionEnd::RemoteToAgent(e);
            }
        }
        SessionEnd::Clean
    }
}

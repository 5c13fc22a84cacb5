//! Framelink - a framed relay between an agent channel and the network
//!
//! # Architecture
//!
//! ```text
//! agent channel → Framed Channel → Handshake (once, stream mode)
//!                                → Relay Engine ⇄ remote transport
//! ```
//!
//! One process instance relays exactly one remote connection: a freshly
//! established TCP stream, or one shared UDP socket multiplexed by
//! address. The agent side speaks a length-prefixed framing protocol;
//! the remote side speaks raw bytes (stream) or datagrams.
//!
//! ## Core Principles
//!
//! - Each direction is one pump owning one source and one sink
//! - The only cross-pump state is a one-writer-wins running flag
//! - Every agent-side byte passes through the byte accumulator, so
//!   callers never observe partial frames
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── common/          # Core types: Stream, Accumulator, Endpoint
//! ├── channel/         # Framed channel: exact reads, length prefixes
//! ├── transport/       # Remote openers: TCP connect, UDP bind
//! ├── relay/           # Relay engines: stream and datagram pumps
//! ├── handshake.rs     # Address record + sentinel handshake
//! └── config.rs        # JSON configuration
//! ```

// Core types
pub mod common;
pub mod error;

// Protocol and relay layers
pub mod channel;
pub mod handshake;
pub mod relay;
pub mod transport;

// Supporting modules
pub mod config;

// Re-exports for convenience
pub use channel::{FramedChannel, FramedReader, FramedWriter};
pub use common::{Accumulator, Endpoint, Stream};
pub use config::Config;
pub use error::{Error, Result};
pub use handshake::{HandshakeError, REPLY_CONNECTED, REPLY_FAILED};
pub use relay::{DatagramRelay, SessionEnd, StreamRelay, CHUNK_LIMIT};
pub use transport::{DatagramSocket, TcpTransport, Transport};

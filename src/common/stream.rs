//! Stream abstraction
//!
//! Unified duplex byte stream type. The relay core only ever operates on
//! this abstraction, never on a concrete socket type, so in-memory duplex
//! pairs slot in wherever a real transport would.

use tokio::io::{AsyncRead, AsyncWrite};

/// The duplex stream type used throughout the relay.
pub type Stream = Box<dyn AsyncReadWrite + Unpin + Send>;

/// Combined trait for async read + write
pub trait AsyncReadWrite: AsyncRead + AsyncWrite {}

impl<T: AsyncRead + AsyncWrite> AsyncReadWrite for T {}

impl std::fmt::Debug for dyn AsyncReadWrite + Unpin + Send {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AsyncReadWrite")
    }
}

/// Trait for types that can be converted into a Stream
pub trait IntoStream {
    fn into_stream(self) -> Stream;
}

impl<T> IntoStream for T
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn into_stream(self) -> Stream {
        Box::new(self)
    }
}

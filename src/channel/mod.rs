//! Framed channel
//!
//! Wraps one raw duplex byte source and layers two things on top of it:
//! exact-size reads (via the byte [`Accumulator`]) and length-prefixed
//! framing. Every byte delivered by the raw source passes through the
//! accumulator before a caller sees it, so callers never observe partial
//! frames.
//!
//! A channel splits into independent read and write halves, one per
//! relay direction. Each half is owned by exactly one pump, so neither
//! the accumulator nor the raw transport needs a lock.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::common::Accumulator;
use crate::error::{Error, Result};

/// Size of the big-endian length prefix on every frame.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Upper bound on a decoded frame length. A corrupt prefix would
/// otherwise drive an arbitrarily large allocation.
pub const MAX_FRAME_LEN: usize = 1 << 24;

/// A raw duplex source with framing support. Split into halves before
/// use; the halves are the working interface.
pub struct FramedChannel<T> {
    inner: T,
}

impl<T> FramedChannel<T>
where
    T: AsyncRead + AsyncWrite + Send,
{
    /// Take ownership of a raw duplex source.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Split into read and write halves (consumes self).
    pub fn split(self) -> (FramedReader<ReadHalf<T>>, FramedWriter<WriteHalf<T>>) {
        let (read_half, write_half) = tokio::io::split(self.inner);
        (FramedReader::new(read_half), FramedWriter::new(write_half))
    }
}

/// Read half: exact-size reads, best-effort bounded reads, frame reads.
pub struct FramedReader<R> {
    inner: R,
    accumulator: Accumulator,
}

impl<R> FramedReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            accumulator: Accumulator::new(),
        }
    }

    /// Read exactly `size` bytes, buffering partial arrivals until the
    /// request can be satisfied in full.
    ///
    /// Each raw read asks for at most the bytes still missing. A raw
    /// read returning zero bytes is the transport's closed-connection
    /// signal and fails with [`Error::ConnectionClosed`]; a merely-empty
    /// socket parks this task instead of returning zero, so closure is
    /// never confused with "no data yet".
    pub async fn read_exact(&mut self, size: usize) -> Result<Bytes> {
        while self.accumulator.len() < size {
            let remaining = size - self.accumulator.len();
            let mut buf = vec![0u8; remaining];
            let n = self.inner.read(&mut buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            self.accumulator.append(&buf[..n]);
        }

        self.accumulator.take_exact(size)
    }

    /// Issue exactly one bounded raw read and return whatever arrived,
    /// without buffering through the accumulator.
    ///
    /// Used on the remote side of the stream relay so partial arrivals
    /// are forwarded promptly instead of waiting to fill `max`.
    pub async fn read_up_to(&mut self, max: usize) -> Result<Bytes> {
        let mut buf = vec![0u8; max];
        let n = self.inner.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        buf.truncate(n);
        Ok(Bytes::from(buf))
    }

    /// Read one length-prefixed frame: 4-byte big-endian length, then
    /// exactly that many payload bytes.
    pub async fn read_frame(&mut self) -> Result<Bytes> {
        let prefix = self.read_exact(LENGTH_PREFIX_LEN).await?;
        let length = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;

        if length > MAX_FRAME_LEN {
            return Err(Error::Protocol(format!(
                "frame length {length} exceeds maximum {MAX_FRAME_LEN}"
            )));
        }

        self.read_exact(length).await
    }

    /// Number of bytes currently buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.accumulator.len()
    }
}

/// Write half: full writes and frame writes.
pub struct FramedWriter<W> {
    inner: W,
}

impl<W> FramedWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write `data` in full and flush. Transient would-block conditions
    /// are absorbed by the runtime; any other transport error surfaces
    /// as [`Error::Io`].
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Write one length-prefixed frame. The two underlying writes never
    /// interleave with another writer because each write half has a
    /// single owner.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let length = u32::try_from(payload.len()).map_err(|_| {
            Error::Protocol(format!("payload too large to frame: {} bytes", payload.len()))
        })?;

        self.inner.write_all(&length.to_be_bytes()).await?;
        self.inner.write_all(payload).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the underlying sink, signalling end-of-stream to the
    /// peer.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

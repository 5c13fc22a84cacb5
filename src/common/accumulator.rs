//! Byte accumulator
//!
//! An unbounded append-only byte queue with exact-size dequeue. It turns
//! a source that delivers arbitrary partial reads into one that can
//! satisfy exact-size read requests: callers append whatever arrived and
//! take out exactly what they need once enough has accumulated.
//!
//! Pure in-memory structure, no I/O awareness. One instance is owned by
//! exactly one channel read half, so no locking is needed.

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// FIFO byte buffer with exact-size dequeue.
#[derive(Debug, Default)]
pub struct Accumulator {
    buffer: BytesMut,
}

impl Accumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append bytes to the tail. Always succeeds.
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Remove and return exactly `size` bytes from the front.
    ///
    /// Fails with [`Error::InsufficientData`] when fewer than `size`
    /// bytes are buffered, leaving the buffer unmodified. The caller is
    /// expected to refill and retry; this is not a blocking call.
    pub fn take_exact(&mut self, size: usize) -> Result<Bytes> {
        if self.buffer.len() < size {
            return Err(Error::InsufficientData {
                needed: size,
                available: self.buffer.len(),
            });
        }

        Ok(self.buffer.split_to(size).freeze())
    }

    /// Remove and return the entire buffered content.
    pub fn take_all(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_then_take_exact_preserves_order() {
        let mut acc = Accumulator::new();
        acc.append(b"hel");
        acc.append(b"lo ");
        acc.append(b"world");
        assert_eq!(acc.len(), 11);

        let taken = acc.take_exact(5).unwrap();
        assert_eq!(&taken[..], b"hello");

        // Remainder is exactly the suffix, still in order.
        assert_eq!(acc.len(), 6);
        let rest = acc.take_all();
        assert_eq!(&rest[..], b" world");
        assert!(acc.is_empty());
    }

    #[test]
    fn test_take_exact_underflow_leaves_buffer_untouched() {
        let mut acc = Accumulator::new();
        acc.append(b"abc");

        let err = acc.take_exact(4).unwrap_err();
        match err {
            Error::InsufficientData { needed, available } => {
                assert_eq!(needed, 4);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Unmodified after the failed take.
        assert_eq!(acc.len(), 3);
        assert_eq!(&acc.take_exact(3).unwrap()[..], b"abc");
    }

    #[test]
    fn test_take_exact_zero() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.take_exact(0).unwrap().len(), 0);

        acc.append(b"xy");
        assert_eq!(acc.take_exact(0).unwrap().len(), 0);
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_take_all_resets_count() {
        let mut acc = Accumulator::new();
        acc.append(b"data");
        assert_eq!(&acc.take_all()[..], b"data");
        assert_eq!(acc.len(), 0);
        assert_eq!(acc.take_all().len(), 0);
    }
}

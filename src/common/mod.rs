//! Common types and abstractions
//!
//! Core types used throughout the relay:
//! - Stream: unified async duplex I/O abstraction
//! - Accumulator: byte buffering for exact-size reads
//! - Endpoint: IPv4 destination representation

mod accumulator;
mod endpoint;
mod stream;

pub use accumulator::Accumulator;
pub use endpoint::{Endpoint, ENCODED_LEN as ENDPOINT_LEN};
pub use stream::{AsyncReadWrite, IntoStream, Stream};

// Re-export error types from crate root
pub use crate::error::{Error, Result};

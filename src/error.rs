//! Error types for Framelink

use thiserror::Error;

/// Main error type for Framelink
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Insufficient data: need {needed} bytes, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl Error {
    /// True for the clean peer-closure case, which ends a session
    /// without counting as a pump failure.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::ConnectionClosed)
    }
}

/// Result type alias for Framelink
pub type Result<T> = std::result::Result<T, Error>;

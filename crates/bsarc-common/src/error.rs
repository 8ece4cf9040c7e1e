//! Error types for bsarc-common.

use thiserror::Error;

/// Common error type for bsarc operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the input ended before a read completed.
    pub fn is_truncation(&self) -> bool {
        match self {
            Error::UnexpectedEof { .. } => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

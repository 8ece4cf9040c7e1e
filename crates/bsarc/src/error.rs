//! Error types for the bsarc facade.

use thiserror::Error;

/// Errors returned by the one-call helpers.
#[derive(Debug, Error)]
pub enum Error {
    /// Archive error.
    #[error(transparent)]
    Archive(#[from] bsarc_ba2::Error),

    /// Invalid entry filter pattern.
    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

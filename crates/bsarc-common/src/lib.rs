//! Common utilities for bsarc.
//!
//! This crate provides the foundational pieces shared by the bsarc crates:
//!
//! - [`BinaryReader`] - Zero-copy binary reading from byte slices
//! - [`ReadExt`] - Fixed-layout struct reads from any [`std::io::Read`]
//! - [`hash`] - BA2 path normalization and CRC-32 name hashing

mod error;
mod reader;

pub mod hash;

pub use error::{Error, Result};
pub use reader::{BinaryReader, ReadExt};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

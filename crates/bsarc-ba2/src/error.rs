//! Error types for the BA2 crate.

use thiserror::Error;

/// Errors that can occur when working with BA2 archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] bsarc_common::Error),

    /// Invalid BA2 magic bytes.
    #[error("invalid BA2 magic: expected \"BTDX\", got {}", String::from_utf8_lossy(.0))]
    InvalidMagic([u8; 4]),

    /// Unsupported format version.
    #[error("unsupported BA2 version: {0}")]
    UnsupportedVersion(u32),

    /// Unknown format variant tag.
    #[error("unsupported archive variant: {}", String::from_utf8_lossy(.0))]
    UnsupportedVariant([u8; 4]),

    /// Entry table inconsistent with itself or with the container.
    #[error("corrupt entry table: {0}")]
    CorruptTable(String),

    /// Entry path would escape the extraction root.
    #[error("unsafe entry path: {0}")]
    UnsafePath(String),

    /// Unsupported compression codec.
    #[error("unsupported compression codec: {0}")]
    UnsupportedCodec(u32),

    /// Decoded length differs from the declared size.
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// The archive was closed or dropped.
    #[error("archive is closed")]
    ClosedArchive,

    /// Operation not available for this entry.
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// Extraction worker pool could not be created.
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

/// Broad error categories reported for failed batch entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ErrorKind {
    /// Bad magic, version, variant, table, or path.
    Format,
    /// Truncated read or filesystem failure.
    Io,
    /// Unsupported codec or decoded size mismatch.
    Codec,
    /// Access after the archive was closed.
    ClosedArchive,
    /// Raw access on a variant without it.
    NotSupported,
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::WorkerPool(_) => ErrorKind::Io,
            Error::Common(e) if e.is_truncation() => ErrorKind::Io,
            Error::Common(_)
            | Error::InvalidMagic(_)
            | Error::UnsupportedVersion(_)
            | Error::UnsupportedVariant(_)
            | Error::CorruptTable(_)
            | Error::UnsafePath(_) => ErrorKind::Format,
            Error::UnsupportedCodec(_) | Error::SizeMismatch { .. } | Error::Decompression(_) => {
                ErrorKind::Codec
            }
            Error::ClosedArchive => ErrorKind::ClosedArchive,
            Error::NotSupported(_) => ErrorKind::NotSupported,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorKind::Format => "format",
            ErrorKind::Io => "io",
            ErrorKind::Codec => "codec",
            ErrorKind::ClosedArchive => "closed-archive",
            ErrorKind::NotSupported => "not-supported",
        })
    }
}

/// Result type for BA2 operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        assert_eq!(Error::Io(eof).kind(), ErrorKind::Io);
        assert_eq!(Error::InvalidMagic(*b"BSA\0").kind(), ErrorKind::Format);
        assert_eq!(
            Error::SizeMismatch {
                expected: 4,
                actual: 3
            }
            .kind(),
            ErrorKind::Codec
        );
        assert_eq!(Error::ClosedArchive.kind(), ErrorKind::ClosedArchive);
        assert_eq!(Error::NotSupported("raw").kind(), ErrorKind::NotSupported);

        let truncated = bsarc_common::Error::UnexpectedEof {
            needed: 2,
            available: 0,
        };
        assert_eq!(Error::Common(truncated).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_magic_display() {
        let msg = Error::InvalidMagic(*b"BSA\0").to_string();
        assert!(msg.contains("BSA"));
    }
}

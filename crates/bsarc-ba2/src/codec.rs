//! Codec dispatch for entry payloads.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::{Error, Result};

/// Compression applied to a stored payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Codec {
    /// Stored as-is.
    Stored,
    /// zlib stream (all Fallout 4 / Fallout 76 archives).
    Zlib,
    /// Raw LZ4 block (Starfield version 3 archives).
    Lz4Block,
}

impl Codec {
    /// Codec declared by a version 3 header.
    pub fn from_archive_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Self::Zlib),
            3 => Ok(Self::Lz4Block),
            other => Err(Error::UnsupportedCodec(other)),
        }
    }

    /// Codec for a payload with the given packed size.
    ///
    /// BA2 marks uncompressed payloads with a packed size of zero.
    #[inline]
    pub fn for_packed_size(self, packed_size: u32) -> Self {
        if packed_size == 0 {
            Self::Stored
        } else {
            self
        }
    }

    /// Largest output `stored` bytes of this codec can decode to.
    ///
    /// Deflate tops out near 1032:1 and an LZ4 block near 255:1, so a
    /// declared size above this bound is a corrupt table, not a payload.
    pub fn max_decoded_len(self, stored: u64) -> u64 {
        match self {
            Self::Stored => stored,
            Self::Zlib => stored.saturating_mul(1032).saturating_add(64),
            Self::Lz4Block => stored.saturating_mul(255).saturating_add(64),
        }
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Zlib => "zlib",
            Self::Lz4Block => "lz4",
        }
    }
}

/// Reject a declared size that `stored` bytes of `codec` cannot produce.
pub fn check_declared_size(codec: Codec, stored: u64, expected_size: u64) -> Result<()> {
    let limit = codec.max_decoded_len(stored);
    if expected_size > limit {
        return Err(Error::Decompression(format!(
            "declared size {} exceeds the {} bytes {} {} bytes can decode to",
            expected_size,
            limit,
            stored,
            codec.name()
        )));
    }
    Ok(())
}

/// Decode a stored payload and check it against the declared size.
pub fn decompress(codec: Codec, data: Vec<u8>, expected_size: usize) -> Result<Vec<u8>> {
    if codec != Codec::Stored {
        check_declared_size(codec, data.len() as u64, expected_size as u64)?;
    }
    let output = match codec {
        Codec::Stored => data,
        Codec::Zlib => decompress_zlib(&data, expected_size)?,
        Codec::Lz4Block => lz4_flex::block::decompress(&data, expected_size)
            .map_err(|e| Error::Decompression(e.to_string()))?,
    };

    if output.len() != expected_size {
        return Err(Error::SizeMismatch {
            expected: expected_size,
            actual: output.len(),
        });
    }
    Ok(output)
}

/// Inflate a zlib stream, reading at most one byte past the declared size so
/// oversized streams are detected without decoding them fully.
fn decompress_zlib(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data).take(expected_size as u64 + 1);
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(output)
}

//! BA2 file header.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed part of the BA2 header, shared by all versions.
///
/// Starfield archives (versions 2 and 3) append extra fields after this
/// struct; see [`Ba2Header::extension_len`].
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct Ba2Header {
    /// Magic bytes (`BTDX`).
    pub magic: [u8; 4],
    /// Format version.
    pub version: u32,
    /// Variant tag (`GNRL` or `DX10`).
    pub variant: [u8; 4],
    /// Number of file records.
    pub file_count: u32,
    /// Absolute offset of the name table, 0 when absent.
    pub name_table_offset: u64,
}

impl Ba2Header {
    /// BA2 magic bytes.
    pub const MAGIC: [u8; 4] = *b"BTDX";

    /// Versions this reader understands.
    pub const SUPPORTED_VERSIONS: [u32; 5] = [1, 2, 3, 7, 8];

    /// Bytes following the fixed header for a given version.
    pub fn extension_len(version: u32) -> usize {
        match version {
            2 => 8,
            3 => 12,
            _ => 0,
        }
    }

    /// Whether the version declares its codec in the header.
    pub fn declares_codec(version: u32) -> bool {
        version == 3
    }
}

/// Format variant discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// General files (`GNRL`).
    General,
    /// Headerless DDS textures split into mip chunks (`DX10`).
    Texture,
}

impl Variant {
    /// On-disk tag.
    pub fn tag(self) -> &'static [u8; 4] {
        match self {
            Self::General => b"GNRL",
            Self::Texture => b"DX10",
        }
    }
}

impl TryFrom<[u8; 4]> for Variant {
    type Error = [u8; 4];

    fn try_from(value: [u8; 4]) -> Result<Self, Self::Error> {
        match &value {
            b"GNRL" => Ok(Self::General),
            b"DX10" => Ok(Self::Texture),
            _ => Err(value),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::General => "GNRL",
            Self::Texture => "DX10",
        })
    }
}

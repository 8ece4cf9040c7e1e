//! BA2 entry table records.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// `GNRL` file record (36 bytes).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct GeneralRecord {
    /// CRC-32 of the lower-cased file stem.
    pub name_hash: u32,
    /// Extension, zero padded.
    pub extension: [u8; 4],
    /// CRC-32 of the lower-cased folder path.
    pub dir_hash: u32,
    /// Unknown flags.
    pub flags: u32,
    /// Absolute payload offset.
    pub offset: u64,
    /// Compressed size, 0 when stored.
    pub packed_size: u32,
    /// Decompressed size.
    pub unpacked_size: u32,
    /// Always [`super::RECORD_SENTINEL`].
    pub sentinel: u32,
}

/// `DX10` texture record header (24 bytes), followed by `chunk_count` chunks.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct TextureRecord {
    /// CRC-32 of the lower-cased file stem.
    pub name_hash: u32,
    /// Extension, zero padded.
    pub extension: [u8; 4],
    /// CRC-32 of the lower-cased folder path.
    pub dir_hash: u32,
    /// Unknown.
    pub unknown: u8,
    /// Number of chunk records that follow.
    pub chunk_count: u8,
    /// Size of each chunk record (24).
    pub chunk_header_size: u16,
    /// Texture height.
    pub height: u16,
    /// Texture width.
    pub width: u16,
    /// Number of mip levels.
    pub mip_count: u8,
    /// DXGI format code.
    pub format: u8,
    /// Bit 0: cubemap.
    pub flags: u8,
    /// Tile mode (console archives).
    pub tile_mode: u8,
}

impl TextureRecord {
    /// Cubemap flag bit.
    pub const FLAG_CUBEMAP: u8 = 0x1;
}

/// `DX10` chunk record (24 bytes).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct TextureChunk {
    /// Absolute payload offset.
    pub offset: u64,
    /// Compressed size, 0 when stored.
    pub packed_size: u32,
    /// Decompressed size.
    pub unpacked_size: u32,
    /// First mip level in this chunk.
    pub start_mip: u16,
    /// Last mip level in this chunk.
    pub end_mip: u16,
    /// Always [`super::RECORD_SENTINEL`].
    pub sentinel: u32,
}

//! BA2 format structures.
//!
//! This module contains the fixed-layout records of a BA2 container: the
//! file header, the `GNRL` file record, and the `DX10` texture record with its
//! chunk sub-table.

mod header;
mod records;

pub use header::{Ba2Header, Variant};
pub use records::{GeneralRecord, TextureChunk, TextureRecord};

/// Value closing every file and chunk record.
pub const RECORD_SENTINEL: u32 = 0xBAAD_F00D;

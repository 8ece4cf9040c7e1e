//! DDS texture handling for BA2 texture archives.
//!
//! `DX10` archives store textures without their DDS header: each entry holds
//! the image dimensions, mip count and DXGI format, and the pixel data is
//! split into independently compressed mip chunks. This crate rebuilds the
//! header for such an entry and validates the reassembled file.
//!
//! # Example
//!
//! ```
//! use bsarc_dds::{build_header, DdsFile, DxgiFormat, TextureInfo};
//!
//! let info = TextureInfo {
//!     width: 8,
//!     height: 8,
//!     mip_count: 1,
//!     format: DxgiFormat::BC1_UNORM,
//!     cubemap: false,
//! };
//!
//! let mut file = build_header(&info);
//! file.extend_from_slice(&[0u8; 32]);
//!
//! let dds = DdsFile::parse(&file)?;
//! assert_eq!(dds.width(), 8);
//! # Ok::<(), bsarc_dds::Error>(())
//! ```

mod build;
mod error;
mod file;
mod format;
mod header;

pub use build::{build_header, header_len, TextureInfo};
pub use error::{Error, Result};
pub use file::DdsFile;
pub use format::DxgiFormat;
pub use header::{DdsHeader, DdsHeaderDxt10, DdsPixelFormat, FourCC};

/// DDS file magic bytes ("DDS ").
pub const DDS_MAGIC: &[u8; 4] = b"DDS ";

//! BA2 archive reader for Bethesda game files.
//!
//! BA2 (`BTDX`) archives package the assets of Fallout 4, Fallout 76 and
//! Starfield. Two variants exist:
//!
//! - `GNRL`: general files, stored or zlib/LZ4 compressed
//! - `DX10`: textures stored without their DDS header and split into
//!   independently compressed mip chunks; the header is rebuilt on read
//!
//! Entries are parsed once at open time. Content is read on demand through
//! a single shared file handle; [`Archive::close`] (or dropping the archive)
//! makes every later read fail with [`Error::ClosedArchive`].
//!
//! # Example
//!
//! ```no_run
//! use bsarc_ba2::{Archive, ExtractOptions, Extractor};
//!
//! let archive = Archive::open("Fallout4 - Textures1.ba2")?;
//!
//! if let Some(entry) = archive.find("textures/armor/helmet_d.dds") {
//!     let dds = entry.read_content()?;
//!     println!("{}: {} bytes", entry.full_path(), dds.len());
//! }
//!
//! let report = Extractor::new(ExtractOptions::default()).run(archive.iter(), "out")?;
//! println!("{} extracted", report.succeeded);
//! # Ok::<(), bsarc_ba2::Error>(())
//! ```
//!
//! # Features
//!
//! - `parallel` (default): batch extraction on a rayon pool
//! - `serde`: `Serialize` for reports and error kinds

mod archive;
mod codec;
mod entry;
mod error;
mod extract;
pub mod format;
mod index;
mod workdir;

#[cfg(test)]
mod fixture;

pub use archive::{Archive, ArchiveConfig};
pub use codec::{decompress, Codec};
pub use entry::{ChunkDescriptor, Entry, EntryKind, PathSource, TextureLayout};
pub use error::{Error, ErrorKind, Result};
pub use extract::{
    CancellationToken, ExtractFailure, ExtractOptions, ExtractionReport, Extractor, Overwrite,
};
pub use index::{HashIndex, HashKey};
pub use workdir::WorkDir;

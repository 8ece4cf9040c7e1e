//! bsarc - Bethesda BA2 archive reading and extraction library.
//!
//! This crate provides a unified interface to the bsarc crates.
//!
//! # Crates
//!
//! - [`bsarc_common`] - Binary reading and BA2 path hashing
//! - [`bsarc_dds`] - DDS header synthesis and validation
//! - [`bsarc_ba2`] - BA2 archive reading and batch extraction
//!
//! # Example
//!
//! ```no_run
//! use bsarc::prelude::*;
//!
//! let report = bsarc::extract_archive(
//!     "Fallout4 - Meshes.ba2",
//!     "out",
//!     Some("meshes/armor/**"),
//!     ExtractOptions::default(),
//! )?;
//! println!("{} extracted, {} failed", report.succeeded, report.failures.len());
//! # Ok::<(), bsarc::Error>(())
//! ```

mod error;
mod filter;

use std::path::Path;

use tracing::info;

pub use bsarc_ba2 as ba2;
pub use bsarc_common as common;
pub use bsarc_dds as dds;

pub use error::{Error, Result};
pub use filter::EntryFilter;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::EntryFilter;
    pub use bsarc_ba2::{
        Archive, ArchiveConfig, CancellationToken, Entry, EntryKind, ExtractOptions,
        ExtractionReport, Extractor, Overwrite, WorkDir,
    };
    pub use bsarc_common::hash::hash_path;
    pub use bsarc_dds::{DdsFile, DxgiFormat};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open an archive and extract the entries matching `filter` (all entries
/// when `None`) below `destination`.
pub fn extract_archive<P, Q>(
    path: P,
    destination: Q,
    filter: Option<&str>,
    options: bsarc_ba2::ExtractOptions,
) -> Result<bsarc_ba2::ExtractionReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let filter = filter.map(EntryFilter::new).transpose()?;
    let archive = bsarc_ba2::Archive::open(path)?;

    let selected = archive
        .iter()
        .filter(|e| filter.as_ref().map_or(true, |f| f.matches(e)));
    let report = bsarc_ba2::Extractor::new(options).run(selected, destination)?;

    info!(
        archive = archive.name(),
        succeeded = report.succeeded,
        failed = report.failures.len(),
        "archive extracted"
    );
    Ok(report)
}

//! Scratch directory for previewing entries on disk.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::entry::Entry;
use crate::Result;

const PREFIX: &str = "bsarc-";

/// A uniquely named temporary directory, removed when dropped.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create a directory under the system temp location.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
        debug!(path = %dir.path().display(), "created work directory");
        Ok(Self { dir })
    }

    /// Create a directory under `parent`.
    pub fn new_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "created work directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Extract an entry, keeping its folder structure.
    pub fn extract(&self, entry: &Entry) -> Result<PathBuf> {
        entry.extract_to(self.dir.path(), true)
    }

    /// Remove the directory, reporting any failure.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

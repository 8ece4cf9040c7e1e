//! Hash/path index.
//!
//! Maps a record's hash key to the index of the entry that owns it. The
//! first entry seen for a key is canonical; later entries with the same key
//! are kept as shadowed duplicates instead of replacing it.

use bsarc_common::hash::{Extension, PathHash};
use rustc_hash::FxHashMap;
use tracing::warn;

/// Lookup key of an entry.
///
/// The BA2 name hash excludes the extension, so `helmet.dds` and
/// `helmet.nif` in the same folder share dir and name hashes and are only
/// told apart by the extension bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub dir_hash: u32,
    pub name_hash: u32,
    pub extension: Extension,
}

impl From<PathHash> for HashKey {
    fn from(hash: PathHash) -> Self {
        Self {
            dir_hash: hash.dir_hash,
            name_hash: hash.name_hash,
            extension: hash.extension,
        }
    }
}

/// Read-only index built once per archive.
#[derive(Debug, Default)]
pub struct HashIndex {
    canonical: FxHashMap<HashKey, usize>,
    /// (dir_hash, name_hash) -> first entry, across extensions
    by_hashes: FxHashMap<(u32, u32), usize>,
    /// shadowed entry index -> canonical entry index
    shadowed: FxHashMap<usize, usize>,
}

impl HashIndex {
    /// Build an index from `(entry index, key)` pairs in on-disk order.
    pub fn build<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = (usize, HashKey)>,
    {
        let mut index = Self::default();

        for (entry, key) in keys {
            index
                .by_hashes
                .entry((key.dir_hash, key.name_hash))
                .or_insert(entry);

            match index.canonical.get(&key) {
                Some(&first) => {
                    warn!(
                        entry,
                        canonical = first,
                        dir_hash = key.dir_hash,
                        name_hash = key.name_hash,
                        "duplicate hash key, entry is shadowed"
                    );
                    index.shadowed.insert(entry, first);
                }
                None => {
                    index.canonical.insert(key, entry);
                }
            }
        }

        index
    }

    /// Canonical entry index for a key.
    #[inline]
    pub fn resolve(&self, key: &HashKey) -> Option<usize> {
        self.canonical.get(key).copied()
    }

    /// First entry with the given folder and name hashes, whatever its
    /// extension.
    #[inline]
    pub fn resolve_hashes(&self, dir_hash: u32, name_hash: u32) -> Option<usize> {
        self.by_hashes.get(&(dir_hash, name_hash)).copied()
    }

    /// Whether an entry lost its key to an earlier entry.
    #[inline]
    pub fn is_shadowed(&self, entry: usize) -> bool {
        self.shadowed.contains_key(&entry)
    }

    /// Canonical entry a shadowed entry collides with.
    pub fn canonical_of(&self, entry: usize) -> Option<usize> {
        self.shadowed.get(&entry).copied()
    }

    /// Shadowed `(entry, canonical)` pairs ordered by entry index.
    pub fn shadowed(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<_> = self.shadowed.iter().map(|(&e, &c)| (e, c)).collect();
        pairs.sort_unstable();
        pairs
    }

    /// Number of shadowed entries.
    pub fn shadowed_count(&self) -> usize {
        self.shadowed.len()
    }

    /// Number of canonical keys.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Whether the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

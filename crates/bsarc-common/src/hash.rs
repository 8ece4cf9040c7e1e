//! BA2 path hashing.
//!
//! BA2 records identify files by the CRC-32 (IEEE) of the lower-cased folder
//! path and of the lower-cased file stem, plus up to four bytes of extension.
//! Paths use backslash separators before hashing.

/// Extension bytes as stored in a BA2 record (zero padded).
pub type Extension = [u8; 4];

/// Hashes of a single archive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathHash {
    /// CRC-32 of the folder path (no trailing separator).
    pub dir_hash: u32,
    /// CRC-32 of the file name without extension.
    pub name_hash: u32,
    /// Extension without the dot, zero padded.
    pub extension: Extension,
}

/// Compute the CRC-32 of a byte slice.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Normalize a path the way BA2 hashes it.
///
/// ASCII letters are lower-cased, `/` becomes `\` and leading separators are
/// dropped.
pub fn normalize(path: &str) -> String {
    let lowered: String = path
        .chars()
        .map(|c| match c {
            '/' => '\\',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    lowered.trim_start_matches('\\').to_string()
}

/// Split a normalized path into `(folder, stem, extension)`.
pub fn split_path(path: &str) -> (&str, &str, &str) {
    let (folder, file) = match path.rfind(['\\', '/']) {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    };
    match file.rfind('.') {
        Some(pos) => (folder, &file[..pos], &file[pos + 1..]),
        None => (folder, file, ""),
    }
}

/// Pack an extension string into its on-disk form.
pub fn pack_extension(ext: &str) -> Extension {
    let mut packed = [0u8; 4];
    for (dst, src) in packed.iter_mut().zip(ext.bytes()) {
        *dst = src.to_ascii_lowercase();
    }
    packed
}

/// Decode on-disk extension bytes, stopping at the first zero.
pub fn unpack_extension(ext: &Extension) -> String {
    let len = ext.iter().position(|&b| b == 0).unwrap_or(ext.len());
    String::from_utf8_lossy(&ext[..len]).into_owned()
}

/// Hash an archive path.
pub fn hash_path(path: &str) -> PathHash {
    let normalized = normalize(path);
    let (folder, stem, ext) = split_path(&normalized);
    PathHash {
        dir_hash: hash_bytes(folder.as_bytes()),
        name_hash: hash_bytes(stem.as_bytes()),
        extension: pack_extension(ext),
    }
}

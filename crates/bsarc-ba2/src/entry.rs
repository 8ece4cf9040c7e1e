//! BA2 archive entry.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use bsarc_common::hash::{unpack_extension, Extension};
use bsarc_dds::DxgiFormat;

use crate::archive::Shared;
use crate::codec::{self, Codec};
use crate::extract::{ensure_dir, Outcome, Overwrite};
use crate::index::HashKey;
use crate::{Error, Result};

/// Block size used when streaming content to disk.
const WRITE_BLOCK: usize = 64 * 1024;

/// Where an entry's path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    /// Name table path whose hashes match the record.
    Verified,
    /// Name table path whose hashes disagree with the record.
    Unverified,
    /// No name table; the path was derived from the hashes.
    Synthetic,
}

/// Payload layout of an entry.
#[derive(Debug, Clone)]
pub enum EntryKind {
    /// Uncompressed general file.
    StandardFile,
    /// Compressed general file.
    CompressedFile { codec: Codec },
    /// Texture split into mip chunks with a synthesized DDS header.
    ChunkedTexture(TextureLayout),
}

/// Texture metadata and chunk table of a `DX10` entry.
#[derive(Debug, Clone)]
pub struct TextureLayout {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    pub format: DxgiFormat,
    pub cubemap: bool,
    /// Chunks in ascending mip order.
    pub chunks: Vec<ChunkDescriptor>,
    pub(crate) header: Vec<u8>,
}

impl TextureLayout {
    /// The DDS header prepended to the chunk data.
    pub fn header(&self) -> &[u8] {
        &self.header
    }
}

/// One independently compressed run of mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub offset: u64,
    pub packed_size: u32,
    pub unpacked_size: u32,
    pub start_mip: u16,
    pub end_mip: u16,
    pub codec: Codec,
}

impl ChunkDescriptor {
    /// Bytes the chunk occupies in the container.
    #[inline]
    pub fn stored_size(&self) -> u64 {
        if self.packed_size == 0 {
            self.unpacked_size as u64
        } else {
            self.packed_size as u64
        }
    }
}

/// Non-owning link from an entry to its archive's shared reader.
#[derive(Debug, Clone)]
pub(crate) struct ArchiveHandle(Weak<Shared>);

impl ArchiveHandle {
    pub(crate) fn new(shared: &Arc<Shared>) -> Self {
        Self(Arc::downgrade(shared))
    }

    fn upgrade(&self) -> Result<Arc<Shared>> {
        self.0.upgrade().ok_or(Error::ClosedArchive)
    }
}

/// Record fields an entry is built from.
#[derive(Debug)]
pub(crate) struct EntryRecord {
    pub name_hash: u32,
    pub dir_hash: u32,
    pub extension: Extension,
    pub offset: u64,
    pub size: u64,
    pub real_size: u64,
    pub kind: EntryKind,
}

/// A file within a BA2 archive.
///
/// Entries are created once when the archive is opened and keep their index
/// and hashes for the archive's lifetime. Reading content goes through the
/// archive's shared reader, so every read fails with
/// [`Error::ClosedArchive`] once the archive is closed or dropped.
#[derive(Debug)]
pub struct Entry {
    index: usize,
    name_hash: u32,
    dir_hash: u32,
    extension: Extension,
    full_path: String,
    path_source: PathSource,
    offset: u64,
    size: u64,
    real_size: u64,
    kind: EntryKind,
    bytes_written: AtomicU64,
    archive: ArchiveHandle,
}

impl Entry {
    pub(crate) fn new(
        index: usize,
        record: EntryRecord,
        full_path: String,
        path_source: PathSource,
        archive: ArchiveHandle,
    ) -> Self {
        Self {
            index,
            name_hash: record.name_hash,
            dir_hash: record.dir_hash,
            extension: record.extension,
            full_path,
            path_source,
            offset: record.offset,
            size: record.size,
            real_size: record.real_size,
            kind: record.kind,
            bytes_written: AtomicU64::new(0),
            archive,
        }
    }

    /// Position in the archive's entry table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// CRC-32 of the lower-cased file stem.
    #[inline]
    pub fn name_hash(&self) -> u32 {
        self.name_hash
    }

    /// CRC-32 of the lower-cased folder path.
    #[inline]
    pub fn dir_hash(&self) -> u32 {
        self.dir_hash
    }

    /// Key used by the archive's hash index.
    pub fn hash_key(&self) -> HashKey {
        HashKey {
            dir_hash: self.dir_hash,
            name_hash: self.name_hash,
            extension: self.extension,
        }
    }

    /// Extension from the record, without the dot.
    pub fn extension(&self) -> String {
        unpack_extension(&self.extension)
    }

    /// Full path within the archive, backslash separated.
    #[inline]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Full path in lower case.
    pub fn lower_path(&self) -> String {
        self.full_path.to_lowercase()
    }

    /// File name including extension.
    pub fn file_name(&self) -> &str {
        match self.full_path.rfind(['\\', '/']) {
            Some(pos) => &self.full_path[pos + 1..],
            None => &self.full_path,
        }
    }

    /// Folder part of the path, empty for root-level files.
    pub fn folder(&self) -> &str {
        match self.full_path.rfind(['\\', '/']) {
            Some(pos) => &self.full_path[..pos],
            None => "",
        }
    }

    /// Where the path came from.
    #[inline]
    pub fn path_source(&self) -> PathSource {
        self.path_source
    }

    /// Whether the path was read from the archive rather than derived.
    #[inline]
    pub fn is_path_authoritative(&self) -> bool {
        self.path_source != PathSource::Synthetic
    }

    /// Whether any part of the payload is compressed.
    pub fn is_compressed(&self) -> bool {
        match &self.kind {
            EntryKind::StandardFile => false,
            EntryKind::CompressedFile { .. } => true,
            EntryKind::ChunkedTexture(layout) => layout.chunks.iter().any(|c| c.codec != Codec::Stored),
        }
    }

    /// Offset of the payload (first chunk for textures).
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes occupied in the container.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Length of [`Entry::read_content`]'s output.
    #[inline]
    pub fn real_size(&self) -> u64 {
        self.real_size
    }

    /// Payload layout.
    #[inline]
    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// Texture layout for `DX10` entries.
    pub fn texture(&self) -> Option<&TextureLayout> {
        match &self.kind {
            EntryKind::ChunkedTexture(layout) => Some(layout),
            _ => None,
        }
    }

    /// Bytes produced by the current or last read/extraction.
    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Read and decompress the entry.
    ///
    /// Repeated calls return identical bytes.
    pub fn read_content(&self) -> Result<Vec<u8>> {
        self.bytes_written.store(0, Ordering::Relaxed);
        let archive = self.archive.upgrade()?;
        let data = self.decode(&archive)?;
        self.bytes_written.store(data.len() as u64, Ordering::Relaxed);
        Ok(data)
    }

    /// Read the stored bytes without decompressing.
    ///
    /// Only compressed general files have a stored form worth re-extracting.
    pub fn read_raw_content(&self) -> Result<Vec<u8>> {
        match &self.kind {
            EntryKind::CompressedFile { .. } => {
                self.archive.upgrade()?.read_at(self.offset, self.size)
            }
            _ => Err(Error::NotSupported(
                "raw content is only available for compressed general files",
            )),
        }
    }

    /// Extract to `destination`, optionally under the entry's folder and
    /// with a different file name. Returns the written path.
    pub fn extract<P: AsRef<Path>>(
        &self,
        destination: P,
        preserve_folder: bool,
        new_name: Option<&str>,
    ) -> Result<PathBuf> {
        match self.extract_with(destination.as_ref(), preserve_folder, new_name, Overwrite::Replace)? {
            Outcome::Written(path) | Outcome::Skipped(path) => Ok(path),
        }
    }

    /// Extract under the entry's own file name.
    pub fn extract_to<P: AsRef<Path>>(&self, destination: P, preserve_folder: bool) -> Result<PathBuf> {
        self.extract(destination, preserve_folder, None)
    }

    /// Target path for an extraction.
    ///
    /// Fails with [`Error::UnsafePath`] if a path component would leave
    /// `destination`.
    pub fn output_path<P: AsRef<Path>>(
        &self,
        destination: P,
        preserve_folder: bool,
        new_name: Option<&str>,
    ) -> Result<PathBuf> {
        let mut path = destination.as_ref().to_path_buf();
        if preserve_folder {
            push_components(&mut path, self.folder())?;
        }
        let name = new_name.unwrap_or_else(|| self.file_name());
        if name.is_empty() {
            return Err(Error::UnsafePath(self.full_path.clone()));
        }
        push_components(&mut path, name)?;
        Ok(path)
    }

    pub(crate) fn extract_with(
        &self,
        destination: &Path,
        preserve_folder: bool,
        new_name: Option<&str>,
        overwrite: Overwrite,
    ) -> Result<Outcome> {
        let target = self.output_path(destination, preserve_folder, new_name)?;
        if overwrite == Overwrite::Skip && target.exists() {
            return Ok(Outcome::Skipped(target));
        }

        let archive = self.archive.upgrade()?;
        let data = self.decode(&archive)?;

        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true);
        match overwrite {
            Overwrite::Skip => options.create_new(true),
            Overwrite::Replace => options.create(true).truncate(true),
        };
        let file = match options.open(&target) {
            Err(e) if overwrite == Overwrite::Skip && e.kind() == io::ErrorKind::AlreadyExists => {
                return Ok(Outcome::Skipped(target));
            }
            result => result?,
        };

        self.bytes_written.store(0, Ordering::Relaxed);
        let mut writer = BufWriter::new(file);
        for block in data.chunks(WRITE_BLOCK) {
            writer.write_all(block)?;
            self.bytes_written
                .fetch_add(block.len() as u64, Ordering::Relaxed);
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;

        if archive.match_last_write_time() {
            file.set_modified(archive.last_write_time())?;
        }

        Ok(Outcome::Written(target))
    }

    /// Human-readable description of the entry.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{}\nIndex: {}\nStored: {} bytes ({})\nSize: {} bytes\nHashes: dir {:08X}, name {:08X}",
            self.full_path,
            self.index,
            self.size,
            self.codec_label(),
            self.real_size,
            self.dir_hash,
            self.name_hash,
        );
        if let Some(t) = self.texture() {
            text.push_str(&format!(
                "\nTexture: {}x{}, {} mips, {}{}\nChunks: {}",
                t.width,
                t.height,
                t.mip_count,
                t.format,
                if t.cubemap { ", cubemap" } else { "" },
                t.chunks.len()
            ));
        }
        if self.path_source == PathSource::Synthetic {
            text.push_str("\nPath: derived from hashes");
        }
        text
    }

    fn codec_label(&self) -> &'static str {
        match &self.kind {
            EntryKind::StandardFile => Codec::Stored.name(),
            EntryKind::CompressedFile { codec } => codec.name(),
            EntryKind::ChunkedTexture(layout) => layout
                .chunks
                .iter()
                .map(|c| c.codec)
                .find(|c| *c != Codec::Stored)
                .unwrap_or(Codec::Stored)
                .name(),
        }
    }

    /// Read the stored bytes under the archive lock, then decode outside it.
    fn decode(&self, archive: &Shared) -> Result<Vec<u8>> {
        match &self.kind {
            EntryKind::StandardFile => {
                let data = archive.read_at(self.offset, self.size)?;
                codec::decompress(Codec::Stored, data, self.real_size as usize)
            }
            EntryKind::CompressedFile { codec } => {
                let data = archive.read_at(self.offset, self.size)?;
                codec::decompress(*codec, data, self.real_size as usize)
            }
            EntryKind::ChunkedTexture(layout) => {
                for chunk in &layout.chunks {
                    codec::check_declared_size(
                        chunk.codec,
                        chunk.stored_size(),
                        chunk.unpacked_size as u64,
                    )?;
                }
                let mut output = Vec::new();
                usize::try_from(self.real_size)
                    .ok()
                    .and_then(|n| output.try_reserve_exact(n).ok())
                    .ok_or_else(|| {
                        Error::Decompression(format!(
                            "cannot allocate {} bytes for texture",
                            self.real_size
                        ))
                    })?;
                output.extend_from_slice(&layout.header);
                for chunk in &layout.chunks {
                    let data = archive.read_at(chunk.offset, chunk.stored_size())?;
                    let data = codec::decompress(chunk.codec, data, chunk.unpacked_size as usize)?;
                    output.extend_from_slice(&data);
                }
                Ok(output)
            }
        }
    }
}

/// Append archive path components to `path`, rejecting anything that could
/// leave the extraction root.
fn push_components(path: &mut PathBuf, archive_path: &str) -> Result<()> {
    for component in archive_path.split(['\\', '/']) {
        match component {
            "" | "." => continue,
            ".." => return Err(Error::UnsafePath(archive_path.to_string())),
            c if c.contains(':') => return Err(Error::UnsafePath(archive_path.to_string())),
            c => path.push(c),
        }
    }
    Ok(())
}

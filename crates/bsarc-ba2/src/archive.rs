//! BA2 archive reader.
//!
//! The whole entry table is parsed up front; payloads are read on demand
//! through a single shared file handle. Only the seek and read run under the
//! handle's lock, decompression happens on the caller's thread afterwards.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use bsarc_common::hash::{hash_path, unpack_extension};
use bsarc_common::{BinaryReader, ReadExt};
use bsarc_dds::{build_header, DxgiFormat, TextureInfo};
use byteorder::{LittleEndian, ReadBytesExt};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::entry::{ArchiveHandle, ChunkDescriptor, Entry, EntryKind, EntryRecord, PathSource, TextureLayout};
use crate::format::{Ba2Header, GeneralRecord, TextureChunk, TextureRecord, Variant, RECORD_SENTINEL};
use crate::index::{HashIndex, HashKey};
use crate::{Error, Result};

/// Options applied when opening an archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveConfig {
    /// Copy the archive's modification time onto extracted files.
    pub match_last_write_time: bool,
}

/// State shared between an archive and its entries.
pub(crate) struct Shared {
    file: Mutex<Option<File>>,
    len: u64,
    last_write_time: SystemTime,
    match_last_write_time: AtomicBool,
}

impl Shared {
    /// Read `len` bytes at `offset`. The lock is held only for the read.
    pub(crate) fn read_at(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.len)
            .ok_or_else(|| {
                Error::CorruptTable(format!(
                    "payload {}+{} exceeds container length {}",
                    offset, len, self.len
                ))
            })?;
        let len = usize::try_from(end - offset)
            .map_err(|_| Error::CorruptTable(format!("payload length {} too large", len)))?;

        let mut buf = vec![0u8; len];
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(Error::ClosedArchive)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn last_write_time(&self) -> SystemTime {
        self.last_write_time
    }

    pub(crate) fn match_last_write_time(&self) -> bool {
        self.match_last_write_time.load(Ordering::Relaxed)
    }
}

/// An open BA2 archive.
///
/// # Example
///
/// ```no_run
/// use bsarc_ba2::Archive;
///
/// let archive = Archive::open("Fallout4 - Textures1.ba2")?;
/// for entry in archive.iter() {
///     println!("{}: {} bytes", entry.full_path(), entry.real_size());
/// }
/// # Ok::<(), bsarc_ba2::Error>(())
/// ```
pub struct Archive {
    path: PathBuf,
    name: String,
    version: u32,
    variant: Variant,
    codec: Codec,
    has_name_table: bool,
    entries: Vec<Entry>,
    index: HashIndex,
    shared: Arc<Shared>,
}

impl Archive {
    /// Open an archive with default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ArchiveConfig::default())
    }

    /// Open an archive.
    pub fn open_with<P: AsRef<Path>>(path: P, config: ArchiveConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        let len = metadata.len();
        let last_write_time = metadata.modified()?;

        let parsed = parse(&file, len)?;

        let shared = Arc::new(Shared {
            file: Mutex::new(Some(file)),
            len,
            last_write_time,
            match_last_write_time: AtomicBool::new(config.match_last_write_time),
        });

        let has_name_table = parsed.names.is_some();
        let mut names = parsed.names.map(Vec::into_iter);
        let entries: Vec<Entry> = parsed
            .records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let name = names.as_mut().and_then(Iterator::next);
                let (full_path, source) = resolve_path(index, &record, name);
                Entry::new(index, record, full_path, source, ArchiveHandle::new(&shared))
            })
            .collect();

        let index = HashIndex::build(entries.iter().map(|e| (e.index(), e.hash_key())));

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        debug!(
            archive = %name,
            version = parsed.version,
            variant = %parsed.variant,
            codec = parsed.codec.name(),
            entries = entries.len(),
            shadowed = index.shadowed_count(),
            "opened archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            name,
            version: parsed.version,
            variant: parsed.variant,
            codec: parsed.codec,
            has_name_table,
            entries,
            index,
            shared,
        })
    }

    /// Archive file name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the archive was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format version.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Format variant.
    #[inline]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Codec used by compressed payloads.
    #[inline]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Whether entry paths came from a name table.
    #[inline]
    pub fn has_name_table(&self) -> bool {
        self.has_name_table
    }

    /// Number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries in on-disk order.
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterate over entries in on-disk order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Get entry by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Find an entry by path (case-insensitive, either separator).
    pub fn find(&self, path: &str) -> Option<&Entry> {
        self.resolve(&hash_path(path).into())
    }

    /// Canonical entry for a hash key.
    pub fn resolve(&self, key: &HashKey) -> Option<&Entry> {
        self.index.resolve(key).and_then(|i| self.entries.get(i))
    }

    /// First entry with the given folder and name hashes.
    pub fn resolve_hashes(&self, dir_hash: u32, name_hash: u32) -> Option<&Entry> {
        self.index
            .resolve_hashes(dir_hash, name_hash)
            .and_then(|i| self.entries.get(i))
    }

    /// Whether an entry is hidden by an earlier entry with the same key.
    #[inline]
    pub fn is_shadowed(&self, index: usize) -> bool {
        self.index.is_shadowed(index)
    }

    /// The archive's hash index.
    #[inline]
    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    /// Modification time of the archive file when it was opened.
    pub fn last_write_time(&self) -> SystemTime {
        self.shared.last_write_time()
    }

    /// Whether extraction copies the archive's modification time.
    pub fn match_last_write_time(&self) -> bool {
        self.shared.match_last_write_time()
    }

    /// Set whether extraction copies the archive's modification time.
    pub fn set_match_last_write_time(&self, value: bool) {
        self.shared
            .match_last_write_time
            .store(value, Ordering::Relaxed);
    }

    /// Release the file handle. Later reads fail with
    /// [`Error::ClosedArchive`].
    pub fn close(&self) {
        if self.shared.file.lock().take().is_some() {
            debug!(archive = %self.name, "closed archive");
        }
    }

    /// Whether [`Archive::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.file.lock().is_none()
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("variant", &self.variant)
            .field("codec", &self.codec)
            .field("entry_count", &self.entries.len())
            .finish()
    }
}

struct Parsed {
    version: u32,
    variant: Variant,
    codec: Codec,
    records: Vec<EntryRecord>,
    names: Option<Vec<String>>,
}

fn parse(file: &File, len: u64) -> Result<Parsed> {
    let mut reader = BufReader::new(file);

    let header: Ba2Header = reader.read_struct()?;
    let version = header.version;
    if header.magic != Ba2Header::MAGIC {
        return Err(Error::InvalidMagic(header.magic));
    }
    if !Ba2Header::SUPPORTED_VERSIONS.contains(&version) {
        return Err(Error::UnsupportedVersion(version));
    }
    let variant = Variant::try_from(header.variant).map_err(Error::UnsupportedVariant)?;

    let mut codec = Codec::Zlib;
    if Ba2Header::extension_len(version) > 0 {
        let _unknown = reader.read_u64::<LittleEndian>()?;
        if Ba2Header::declares_codec(version) {
            codec = Codec::from_archive_id(reader.read_u32::<LittleEndian>()?)?;
        }
    }

    let table_start = (std::mem::size_of::<Ba2Header>() + Ba2Header::extension_len(version)) as u64;
    let min_record = match variant {
        Variant::General => std::mem::size_of::<GeneralRecord>(),
        Variant::Texture => std::mem::size_of::<TextureRecord>(),
    } as u64;
    let file_count = header.file_count as usize;
    if table_start + min_record * file_count as u64 > len {
        return Err(Error::CorruptTable(format!(
            "{} records do not fit in {} bytes",
            file_count, len
        )));
    }

    debug!(
        version,
        %variant,
        file_count,
        "parsing entry table"
    );

    let records = match variant {
        Variant::General => read_general(&mut reader, file_count, codec, len)?,
        Variant::Texture => read_textures(&mut reader, file_count, codec, len)?,
    };

    let name_table_offset = header.name_table_offset;
    let names = if name_table_offset == 0 {
        None
    } else {
        if name_table_offset > len {
            return Err(Error::CorruptTable(format!(
                "name table offset {} beyond container length {}",
                name_table_offset, len
            )));
        }
        reader.seek(SeekFrom::Start(name_table_offset))?;
        let mut table = Vec::with_capacity((len - name_table_offset) as usize);
        reader.read_to_end(&mut table)?;

        let mut strings = BinaryReader::new(&table);
        let names = (0..file_count)
            .map(|_| strings.read_bstring())
            .collect::<bsarc_common::Result<Vec<_>>>()?;
        Some(names)
    };

    Ok(Parsed {
        version,
        variant,
        codec,
        records,
        names,
    })
}

fn read_general<R: Read>(reader: &mut R, count: usize, codec: Codec, len: u64) -> Result<Vec<EntryRecord>> {
    let raw: Vec<GeneralRecord> = reader.read_structs(count)?;
    let mut records = Vec::with_capacity(count);

    for (i, record) in raw.into_iter().enumerate() {
        check_sentinel(i, record.sentinel)?;

        let packed = record.packed_size;
        let unpacked = record.unpacked_size as u64;
        let (size, kind) = if packed == 0 {
            (unpacked, EntryKind::StandardFile)
        } else {
            (packed as u64, EntryKind::CompressedFile { codec })
        };
        check_bounds(i, record.offset, size, len)?;

        records.push(EntryRecord {
            name_hash: record.name_hash,
            dir_hash: record.dir_hash,
            extension: record.extension,
            offset: record.offset,
            size,
            real_size: unpacked,
            kind,
        });
    }
    Ok(records)
}

fn read_textures<R: Read>(reader: &mut R, count: usize, codec: Codec, len: u64) -> Result<Vec<EntryRecord>> {
    let mut records = Vec::with_capacity(count);

    for i in 0..count {
        let record: TextureRecord = reader.read_struct()?;
        let raw: Vec<TextureChunk> = reader.read_structs(record.chunk_count as usize)?;

        let mut chunks = Vec::with_capacity(raw.len());
        for chunk in raw {
            check_sentinel(i, chunk.sentinel)?;
            let descriptor = ChunkDescriptor {
                offset: chunk.offset,
                packed_size: chunk.packed_size,
                unpacked_size: chunk.unpacked_size,
                start_mip: chunk.start_mip,
                end_mip: chunk.end_mip,
                codec: codec.for_packed_size(chunk.packed_size),
            };
            check_bounds(i, descriptor.offset, descriptor.stored_size(), len)?;
            chunks.push(descriptor);
        }
        chunks.sort_by_key(|c| c.start_mip);

        let info = TextureInfo {
            width: record.width as u32,
            height: record.height as u32,
            mip_count: record.mip_count as u32,
            format: DxgiFormat(record.format as u32),
            cubemap: record.flags & TextureRecord::FLAG_CUBEMAP != 0,
        };
        let header = build_header(&info);

        let offset = chunks.first().map_or(0, |c| c.offset);
        let size = chunks.iter().map(ChunkDescriptor::stored_size).sum();
        let real_size = header.len() as u64 + chunks.iter().map(|c| c.unpacked_size as u64).sum::<u64>();

        records.push(EntryRecord {
            name_hash: record.name_hash,
            dir_hash: record.dir_hash,
            extension: record.extension,
            offset,
            size,
            real_size,
            kind: EntryKind::ChunkedTexture(TextureLayout {
                width: info.width,
                height: info.height,
                mip_count: info.mip_count,
                format: info.format,
                cubemap: info.cubemap,
                chunks,
                header,
            }),
        });
    }
    Ok(records)
}

fn check_sentinel(entry: usize, sentinel: u32) -> Result<()> {
    if sentinel != RECORD_SENTINEL {
        return Err(Error::CorruptTable(format!(
            "entry {}: bad record sentinel {:#010x}",
            entry, sentinel
        )));
    }
    Ok(())
}

fn check_bounds(entry: usize, offset: u64, size: u64, len: u64) -> Result<()> {
    let fits = offset
        .checked_add(size)
        .is_some_and(|end| end <= len && (size == 0 || offset < len));
    if !fits {
        return Err(Error::CorruptTable(format!(
            "entry {}: payload {}+{} outside container of {} bytes",
            entry, offset, size, len
        )));
    }
    Ok(())
}

/// Pick the display path for an entry and record where it came from.
fn resolve_path(index: usize, record: &EntryRecord, name: Option<String>) -> (String, PathSource) {
    let Some(name) = name else {
        let ext = unpack_extension(&record.extension);
        let path = if ext.is_empty() {
            format!("{:08x}\\{:08x}", record.dir_hash, record.name_hash)
        } else {
            format!("{:08x}\\{:08x}.{}", record.dir_hash, record.name_hash, ext)
        };
        return (path, PathSource::Synthetic);
    };

    let computed = hash_path(&name);
    if computed.dir_hash == record.dir_hash && computed.name_hash == record.name_hash {
        (name, PathSource::Verified)
    } else {
        warn!(
            entry = index,
            path = %name,
            dir_hash = record.dir_hash,
            name_hash = record.name_hash,
            "name table path does not match record hashes"
        );
        (name, PathSource::Unverified)
    }
}

//! Synthetic BA2 archives for tests.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use bsarc_common::hash::hash_path;
use bsarc_dds::DxgiFormat;
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::format::{Ba2Header, RECORD_SENTINEL};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Texture shape passed to [`Ba2Builder::texture`].
#[derive(Debug, Clone, Copy)]
pub struct TextureSpec {
    width: u32,
    height: u32,
    mip_count: u32,
    format: DxgiFormat,
    cubemap: bool,
    chunks: u32,
    stored: u32,
}

impl TextureSpec {
    pub fn new(width: u32, height: u32, mip_count: u32, format: DxgiFormat) -> Self {
        Self {
            width,
            height,
            mip_count,
            format,
            cubemap: false,
            chunks: 1,
            stored: 0,
        }
    }

    /// Split the mip chain into `chunks` runs; the last run takes the rest.
    pub fn chunked(mut self, chunks: u32) -> Self {
        self.chunks = chunks.clamp(1, self.mip_count);
        self
    }

    /// Keep chunk `index` uncompressed even when the texture is compressed.
    pub fn stored_chunk(mut self, index: u32) -> Self {
        self.stored |= 1 << index;
        self
    }

    pub fn cubemap(mut self) -> Self {
        self.cubemap = true;
        self
    }

    /// `(start_mip, end_mip, data)` for each chunk.
    fn chunks(&self) -> Vec<(u16, u16, Vec<u8>)> {
        let faces = if self.cubemap { 6 } else { 1 };
        let mip_size = |level: u32| {
            self.format
                .surface_size((self.width >> level).max(1), (self.height >> level).max(1))
                .unwrap()
        };

        let mut chunks = Vec::new();
        let mut start = 0;
        for i in 0..self.chunks {
            let end = if i + 1 == self.chunks {
                self.mip_count - 1
            } else {
                start
            };
            let len: usize = (start..=end).map(mip_size).sum::<usize>() * faces;
            let data = (0..len).map(|b| (b % 251) as u8 ^ i as u8).collect();
            chunks.push((start as u16, end as u16, data));
            start = end + 1;
        }
        chunks
    }
}

enum Item {
    General {
        path: String,
        data: Vec<u8>,
        compress: bool,
    },
    Texture {
        path: String,
        spec: TextureSpec,
        compress: bool,
    },
}

impl Item {
    fn path(&self) -> &str {
        match self {
            Item::General { path, .. } | Item::Texture { path, .. } => path,
        }
    }
}

/// Writes BA2 archives in memory.
pub struct Ba2Builder {
    version: u32,
    variant: [u8; 4],
    codec_id: u32,
    names: bool,
    renames: Vec<(usize, String)>,
    items: Vec<Item>,
}

impl Ba2Builder {
    pub fn general(version: u32) -> Self {
        Self::new(version, *b"GNRL")
    }

    pub fn dx10(version: u32) -> Self {
        Self::new(version, *b"DX10")
    }

    fn new(version: u32, variant: [u8; 4]) -> Self {
        Self {
            version,
            variant,
            codec_id: 0,
            names: true,
            renames: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Codec id written into a version 3 header.
    pub fn codec_id(mut self, id: u32) -> Self {
        self.codec_id = id;
        self
    }

    pub fn without_names(mut self) -> Self {
        self.names = false;
        self
    }

    /// Write a different path into the name table than the one hashed.
    pub fn rename(mut self, index: usize, path: &str) -> Self {
        self.renames.push((index, path.to_string()));
        self
    }

    pub fn file(mut self, path: &str, data: Vec<u8>, compress: bool) -> Self {
        self.items.push(Item::General {
            path: path.to_string(),
            data,
            compress,
        });
        self
    }

    pub fn texture(mut self, path: &str, spec: TextureSpec, compress: bool) -> Self {
        self.items.push(Item::Texture {
            path: path.to_string(),
            spec,
            compress,
        });
        self
    }

    fn header_len(&self) -> u64 {
        (std::mem::size_of::<Ba2Header>() + Ba2Header::extension_len(self.version)) as u64
    }

    /// Offset of an item's record in the entry table.
    pub fn record_offset(&self, index: usize) -> u64 {
        self.header_len()
            + self.items[..index]
                .iter()
                .map(|item| match item {
                    Item::General { .. } => 36,
                    Item::Texture { spec, .. } => 24 + 24 * spec.chunks as u64,
                })
                .sum::<u64>()
    }

    /// Offset of the first payload.
    pub fn data_offset(&self) -> u64 {
        self.record_offset(self.items.len())
    }

    /// Offset of an item's first stored payload.
    pub fn payload_offset(&self, index: usize) -> u64 {
        let payloads = self.payloads();
        self.data_offset()
            + payloads[..index]
                .iter()
                .flatten()
                .map(|p| p.stored.len() as u64)
                .sum::<u64>()
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        if self.codec_id == 3 {
            lz4_flex::block::compress(data)
        } else {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
    }

    fn payloads(&self) -> Vec<Vec<Payload>> {
        self.items
            .iter()
            .map(|item| match item {
                Item::General { data, compress, .. } => {
                    vec![self.payload(data.clone(), *compress, 0, 0)]
                }
                Item::Texture { spec, compress, .. } => spec
                    .chunks()
                    .into_iter()
                    .enumerate()
                    .map(|(i, (start, end, data))| {
                        let stored = spec.stored & (1 << i) != 0;
                        self.payload(data, *compress && !stored, start, end)
                    })
                    .collect(),
            })
            .collect()
    }

    fn payload(&self, data: Vec<u8>, compress: bool, start_mip: u16, end_mip: u16) -> Payload {
        let unpacked = data.len() as u32;
        if compress {
            let stored = self.compress(&data);
            Payload {
                packed: stored.len() as u32,
                unpacked,
                stored,
                start_mip,
                end_mip,
            }
        } else {
            Payload {
                packed: 0,
                unpacked,
                stored: data,
                start_mip,
                end_mip,
            }
        }
    }

    /// Serialize the archive.
    pub fn build(&self) -> Vec<u8> {
        let payloads = self.payloads();
        let data_len: u64 = payloads.iter().flatten().map(|p| p.stored.len() as u64).sum();
        let name_table_offset = if self.names {
            self.data_offset() + data_len
        } else {
            0
        };

        let mut out = Vec::new();
        out.extend_from_slice(&Ba2Header::MAGIC);
        out.write_u32::<LittleEndian>(self.version).unwrap();
        out.extend_from_slice(&self.variant);
        out.write_u32::<LittleEndian>(self.items.len() as u32).unwrap();
        out.write_u64::<LittleEndian>(name_table_offset).unwrap();
        if Ba2Header::extension_len(self.version) > 0 {
            out.write_u64::<LittleEndian>(1).unwrap();
            if Ba2Header::declares_codec(self.version) {
                out.write_u32::<LittleEndian>(self.codec_id).unwrap();
            }
        }

        let mut offset = self.data_offset();
        for (item, payloads) in self.items.iter().zip(&payloads) {
            let hash = hash_path(item.path());
            out.write_u32::<LittleEndian>(hash.name_hash).unwrap();
            out.extend_from_slice(&hash.extension);
            out.write_u32::<LittleEndian>(hash.dir_hash).unwrap();

            match item {
                Item::General { .. } => {
                    let p = &payloads[0];
                    out.write_u32::<LittleEndian>(0).unwrap();
                    out.write_u64::<LittleEndian>(offset).unwrap();
                    out.write_u32::<LittleEndian>(p.packed).unwrap();
                    out.write_u32::<LittleEndian>(p.unpacked).unwrap();
                    out.write_u32::<LittleEndian>(RECORD_SENTINEL).unwrap();
                    offset += p.stored.len() as u64;
                }
                Item::Texture { spec, .. } => {
                    out.write_u8(0).unwrap();
                    out.write_u8(payloads.len() as u8).unwrap();
                    out.write_u16::<LittleEndian>(24).unwrap();
                    out.write_u16::<LittleEndian>(spec.height as u16).unwrap();
                    out.write_u16::<LittleEndian>(spec.width as u16).unwrap();
                    out.write_u8(spec.mip_count as u8).unwrap();
                    out.write_u8(spec.format.0 as u8).unwrap();
                    out.write_u8(spec.cubemap as u8).unwrap();
                    out.write_u8(0).unwrap();
                    for p in payloads {
                        out.write_u64::<LittleEndian>(offset).unwrap();
                        out.write_u32::<LittleEndian>(p.packed).unwrap();
                        out.write_u32::<LittleEndian>(p.unpacked).unwrap();
                        out.write_u16::<LittleEndian>(p.start_mip).unwrap();
                        out.write_u16::<LittleEndian>(p.end_mip).unwrap();
                        out.write_u32::<LittleEndian>(RECORD_SENTINEL).unwrap();
                        offset += p.stored.len() as u64;
                    }
                }
            }
        }

        for p in payloads.iter().flatten() {
            out.extend_from_slice(&p.stored);
        }

        if self.names {
            for (i, item) in self.items.iter().enumerate() {
                let name = self
                    .renames
                    .iter()
                    .find(|(index, _)| *index == i)
                    .map_or(item.path(), |(_, name)| name.as_str());
                out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
                out.extend_from_slice(name.as_bytes());
            }
        }

        out
    }

    /// Write the archive to a fresh file in `dir`.
    pub fn write(&self, dir: &Path) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("fixture{n}.ba2"));
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

struct Payload {
    packed: u32,
    unpacked: u32,
    stored: Vec<u8>,
    start_mip: u16,
    end_mip: u16,
}

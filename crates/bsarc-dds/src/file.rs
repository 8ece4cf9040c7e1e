//! DDS file parsing and structural validation.

use bsarc_common::BinaryReader;

use crate::format::DxgiFormat;
use crate::header::{DdsHeader, DdsHeaderDxt10, DdsPixelFormat};
use crate::{Error, Result, DDS_MAGIC};

/// A parsed DDS file whose data length matches its declared mip chain.
#[derive(Debug, Clone)]
pub struct DdsFile<'a> {
    header: DdsHeader,
    dx10: Option<DdsHeaderDxt10>,
    format: DxgiFormat,
    data: &'a [u8],
}

impl<'a> DdsFile<'a> {
    /// Parse and validate a complete DDS file.
    ///
    /// The image data after the header must be exactly one full mip chain per
    /// face (six faces for cubemaps).
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < DDS_MAGIC.len() {
            return Err(Error::InvalidHeader("file too small".into()));
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        if &magic != DDS_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let mut reader = BinaryReader::new(&bytes[4..]);
        let header: DdsHeader = reader.read_struct()?;

        if header.size != DdsHeader::SIZE {
            return Err(Error::InvalidHeader(format!(
                "header size {} (expected {})",
                { header.size },
                DdsHeader::SIZE
            )));
        }
        if header.pixel_format.size != DdsPixelFormat::SIZE {
            return Err(Error::InvalidHeader(format!(
                "pixel format size {} (expected {})",
                { header.pixel_format.size },
                DdsPixelFormat::SIZE
            )));
        }
        if header.width == 0 || header.height == 0 {
            return Err(Error::InvalidHeader("zero dimension".into()));
        }
        let max_levels = u32::BITS - { header.width }.max({ header.height }).leading_zeros();
        if header.mipmap_count > max_levels {
            return Err(Error::InvalidHeader(format!(
                "{} mip levels for a {}x{} image",
                { header.mipmap_count },
                { header.width },
                { header.height }
            )));
        }

        let dx10: Option<DdsHeaderDxt10> = if header.is_dx10() {
            Some(reader.read_struct()?)
        } else {
            None
        };

        let format = match &dx10 {
            Some(ext) => DxgiFormat(ext.dxgi_format),
            None => {
                let pf = header.pixel_format;
                DxgiFormat::from_legacy(&pf).ok_or_else(|| {
                    Error::InvalidHeader(format!("unrecognized pixel format {:?}", pf))
                })?
            }
        };

        let data = &bytes[4 + reader.position()..];
        let file = Self {
            header,
            dx10,
            format,
            data,
        };

        let expected = file.expected_data_len()?;
        if data.len() != expected {
            return Err(Error::MipmapSizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(file)
    }

    /// Image width of the top mip.
    pub fn width(&self) -> u32 {
        self.header.width
    }

    /// Image height of the top mip.
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Number of mip levels (at least 1).
    pub fn mip_count(&self) -> u32 {
        self.header.mipmap_count.max(1)
    }

    /// Pixel format.
    pub fn format(&self) -> DxgiFormat {
        self.format
    }

    /// Whether the texture is a cubemap.
    pub fn is_cubemap(&self) -> bool {
        self.header.is_cubemap()
            || self
                .dx10
                .map_or(false, |ext| ext.misc_flag & DdsHeaderDxt10::MISC_TEXTURECUBE != 0)
    }

    /// Whether the file carries the DX10 extension header.
    pub fn has_dx10_header(&self) -> bool {
        self.dx10.is_some()
    }

    /// Image data following the header(s).
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn expected_data_len(&self) -> Result<usize> {
        if !self.format.has_layout() {
            return Err(Error::UnsupportedFormat(self.format.0));
        }
        let faces = if self.is_cubemap() { 6 } else { 1 };
        self.format
            .mip_chain_size(self.width(), self.height(), self.mip_count())
            .and_then(|chain| chain.checked_mul(faces))
            .ok_or_else(|| Error::InvalidHeader("image size overflows".into()))
    }
}

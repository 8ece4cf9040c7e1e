//! DDS header synthesis for headerless texture payloads.

use zerocopy::IntoBytes;

use crate::format::DxgiFormat;
use crate::header::{DdsHeader, DdsHeaderDxt10, DdsPixelFormat, FourCC};
use crate::DDS_MAGIC;

/// Texture metadata needed to rebuild a DDS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    pub format: DxgiFormat,
    pub cubemap: bool,
}

/// Length of the header [`build_header`] produces for a format.
pub fn header_len(format: DxgiFormat) -> usize {
    let dx10 = if format.legacy_pixel_format().is_some() {
        0
    } else {
        std::mem::size_of::<DdsHeaderDxt10>()
    };
    DDS_MAGIC.len() + std::mem::size_of::<DdsHeader>() + dx10
}

/// Build the magic, header and (when needed) DX10 extension for a texture.
///
/// Formats with a legacy encoding get a plain header; everything else,
/// including formats without a known surface layout, gets the DX10 extension
/// so the DXGI code survives.
pub fn build_header(info: &TextureInfo) -> Vec<u8> {
    let legacy = info.format.legacy_pixel_format();
    let mip_count = info.mip_count.max(1);

    let mut flags = DdsHeader::FLAG_CAPS
        | DdsHeader::FLAG_HEIGHT
        | DdsHeader::FLAG_WIDTH
        | DdsHeader::FLAG_PIXELFORMAT;
    let pitch = info.format.pitch_or_linear_size(info.width, info.height);
    if pitch.is_some() {
        flags |= if info.format.is_compressed() {
            DdsHeader::FLAG_LINEARSIZE
        } else {
            DdsHeader::FLAG_PITCH
        };
    }

    let mut caps = DdsHeader::CAPS_TEXTURE;
    if mip_count > 1 {
        flags |= DdsHeader::FLAG_MIPMAPCOUNT;
        caps |= DdsHeader::CAPS_MIPMAP | DdsHeader::CAPS_COMPLEX;
    }
    let caps2 = if info.cubemap {
        caps |= DdsHeader::CAPS_COMPLEX;
        DdsHeader::CAPS2_CUBEMAP_ALL_FACES
    } else {
        0
    };

    let header = DdsHeader {
        size: DdsHeader::SIZE,
        flags,
        height: info.height,
        width: info.width,
        pitch_or_linear_size: pitch.map_or(0, |p| u32::try_from(p).unwrap_or(u32::MAX)),
        depth: 0,
        mipmap_count: mip_count,
        reserved1: [0; 11],
        pixel_format: legacy.unwrap_or(DdsPixelFormat::four_cc(FourCC::DX10)),
        caps,
        caps2,
        caps3: 0,
        caps4: 0,
        reserved2: 0,
    };

    let mut out = Vec::with_capacity(header_len(info.format));
    out.extend_from_slice(DDS_MAGIC);
    out.extend_from_slice(header.as_bytes());

    if legacy.is_none() {
        let dx10 = DdsHeaderDxt10 {
            dxgi_format: info.format.0,
            resource_dimension: DdsHeaderDxt10::DIMENSION_TEXTURE2D,
            misc_flag: if info.cubemap {
                DdsHeaderDxt10::MISC_TEXTURECUBE
            } else {
                0
            },
            array_size: 1,
            misc_flags2: 0,
        };
        out.extend_from_slice(dx10.as_bytes());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(format: DxgiFormat) -> TextureInfo {
        TextureInfo {
            width: 256,
            height: 128,
            mip_count: 9,
            format,
            cubemap: false,
        }
    }

    #[test]
    fn test_legacy_header_length() {
        let header = build_header(&info(DxgiFormat::BC3_UNORM));
        assert_eq!(header.len(), 128);
        assert_eq!(header.len(), header_len(DxgiFormat::BC3_UNORM));
        assert_eq!(&header[..4], DDS_MAGIC);
        assert_eq!(&header[84..88], b"DXT5");
    }

    #[test]
    fn test_dx10_header_carries_format() {
        let header = build_header(&info(DxgiFormat::BC7_UNORM));
        assert_eq!(header.len(), 148);
        assert_eq!(&header[84..88], b"DX10");
        assert_eq!(u32::from_le_bytes(header[128..132].try_into().unwrap()), 98);
    }

    #[test]
    fn test_linear_size_and_mip_flags() {
        let header = build_header(&info(DxgiFormat::BC1_UNORM));
        let flags = u32::from_le_bytes(header[8..12].try_into().unwrap());
        let linear = u32::from_le_bytes(header[20..24].try_into().unwrap());
        assert_ne!(flags & DdsHeader::FLAG_LINEARSIZE, 0);
        assert_ne!(flags & DdsHeader::FLAG_MIPMAPCOUNT, 0);
        assert_eq!(linear, 64 * 32 * 8);
    }

    #[test]
    fn test_linear_size_saturates() {
        let mut huge = info(DxgiFormat::BC7_UNORM);
        huge.width = 65536;
        huge.height = 65536;
        let header = build_header(&huge);
        let linear = u32::from_le_bytes(header[20..24].try_into().unwrap());
        assert_eq!(linear, u32::MAX);
    }

    #[test]
    fn test_cubemap_caps() {
        let mut cube = info(DxgiFormat::BC7_UNORM);
        cube.cubemap = true;
        let header = build_header(&cube);
        let caps2 = u32::from_le_bytes(header[112..116].try_into().unwrap());
        let misc = u32::from_le_bytes(header[136..140].try_into().unwrap());
        assert_eq!(caps2, DdsHeader::CAPS2_CUBEMAP_ALL_FACES);
        assert_eq!(misc, DdsHeaderDxt10::MISC_TEXTURECUBE);
    }
}

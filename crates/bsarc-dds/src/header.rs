//! DDS header structures.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// DDS file header (follows the 4-byte magic).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct DdsHeader {
    /// Header size (should be 124).
    pub size: u32,
    /// Header flags.
    pub flags: u32,
    /// Image height.
    pub height: u32,
    /// Image width.
    pub width: u32,
    /// Pitch or linear size.
    pub pitch_or_linear_size: u32,
    /// Depth (for volume textures).
    pub depth: u32,
    /// Number of mipmap levels.
    pub mipmap_count: u32,
    /// Reserved.
    pub reserved1: [u32; 11],
    /// Pixel format.
    pub pixel_format: DdsPixelFormat,
    /// Surface capabilities.
    pub caps: u32,
    /// Surface capabilities 2.
    pub caps2: u32,
    /// Surface capabilities 3.
    pub caps3: u32,
    /// Surface capabilities 4.
    pub caps4: u32,
    /// Reserved.
    pub reserved2: u32,
}

impl DdsHeader {
    /// Expected header size.
    pub const SIZE: u32 = 124;

    pub const FLAG_CAPS: u32 = 0x1;
    pub const FLAG_HEIGHT: u32 = 0x2;
    pub const FLAG_WIDTH: u32 = 0x4;
    pub const FLAG_PITCH: u32 = 0x8;
    pub const FLAG_PIXELFORMAT: u32 = 0x1000;
    pub const FLAG_MIPMAPCOUNT: u32 = 0x20000;
    pub const FLAG_LINEARSIZE: u32 = 0x80000;

    pub const CAPS_COMPLEX: u32 = 0x8;
    pub const CAPS_TEXTURE: u32 = 0x1000;
    pub const CAPS_MIPMAP: u32 = 0x40_0000;

    /// Cubemap flag plus all six faces.
    pub const CAPS2_CUBEMAP_ALL_FACES: u32 = 0xFE00;
    pub const CAPS2_CUBEMAP: u32 = 0x200;

    /// Check if this is a DX10 extended header.
    pub fn is_dx10(&self) -> bool {
        self.pixel_format.four_cc == FourCC::DX10
    }

    /// Check if the header describes a cubemap.
    pub fn is_cubemap(&self) -> bool {
        self.caps2 & Self::CAPS2_CUBEMAP != 0
    }
}

/// DDS pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct DdsPixelFormat {
    /// Structure size (should be 32).
    pub size: u32,
    /// Pixel format flags.
    pub flags: u32,
    /// Four-character code for compression.
    pub four_cc: FourCC,
    /// Number of bits per pixel (for uncompressed).
    pub rgb_bit_count: u32,
    /// Red bit mask.
    pub r_bit_mask: u32,
    /// Green bit mask.
    pub g_bit_mask: u32,
    /// Blue bit mask.
    pub b_bit_mask: u32,
    /// Alpha bit mask.
    pub a_bit_mask: u32,
}

impl DdsPixelFormat {
    /// Expected structure size.
    pub const SIZE: u32 = 32;

    pub const ALPHAPIXELS: u32 = 0x1;
    pub const FOURCC: u32 = 0x4;
    pub const RGB: u32 = 0x40;
    pub const LUMINANCE: u32 = 0x20000;

    /// Pixel format identified by a four-character code.
    pub const fn four_cc(code: FourCC) -> Self {
        Self {
            size: Self::SIZE,
            flags: Self::FOURCC,
            four_cc: code,
            rgb_bit_count: 0,
            r_bit_mask: 0,
            g_bit_mask: 0,
            b_bit_mask: 0,
            a_bit_mask: 0,
        }
    }

    /// Uncompressed pixel format described by channel masks.
    pub const fn masked(flags: u32, bit_count: u32, masks: [u32; 4]) -> Self {
        Self {
            size: Self::SIZE,
            flags,
            four_cc: FourCC([0; 4]),
            rgb_bit_count: bit_count,
            r_bit_mask: masks[0],
            g_bit_mask: masks[1],
            b_bit_mask: masks[2],
            a_bit_mask: masks[3],
        }
    }
}

/// Four-character code for compression type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// DXT1 compression.
    pub const DXT1: Self = Self(*b"DXT1");
    /// DXT3 compression.
    pub const DXT3: Self = Self(*b"DXT3");
    /// DXT5 compression.
    pub const DXT5: Self = Self(*b"DXT5");
    /// DX10 extended header.
    pub const DX10: Self = Self(*b"DX10");
    /// BC4U compression.
    pub const BC4U: Self = Self(*b"BC4U");
    /// BC4S compression.
    pub const BC4S: Self = Self(*b"BC4S");
    /// BC5U compression.
    pub const BC5U: Self = Self(*b"BC5U");
    /// BC5S compression.
    pub const BC5S: Self = Self(*b"BC5S");
    /// ATI2 (BC5 unsigned) compression.
    pub const ATI2: Self = Self(*b"ATI2");
}

/// DX10 extended header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct DdsHeaderDxt10 {
    /// DXGI format.
    pub dxgi_format: u32,
    /// Resource dimension.
    pub resource_dimension: u32,
    /// Misc flags.
    pub misc_flag: u32,
    /// Array size.
    pub array_size: u32,
    /// Misc flags 2.
    pub misc_flags2: u32,
}

impl DdsHeaderDxt10 {
    /// `D3D10_RESOURCE_DIMENSION_TEXTURE2D`.
    pub const DIMENSION_TEXTURE2D: u32 = 3;
    /// `D3D10_RESOURCE_MISC_TEXTURECUBE`.
    pub const MISC_TEXTURECUBE: u32 = 0x4;
}

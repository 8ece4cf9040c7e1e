//! DXGI pixel formats used by BA2 texture records.

use crate::header::{DdsPixelFormat, FourCC};

/// A DXGI format code.
///
/// BA2 stores the format as a single byte; only the formats the games ship
/// have a known surface layout, everything else is carried through opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DxgiFormat(pub u32);

impl DxgiFormat {
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const R8G8B8A8_UNORM_SRGB: Self = Self(29);
    pub const R8G8_UNORM: Self = Self(49);
    pub const R8_UNORM: Self = Self(61);
    pub const BC1_UNORM: Self = Self(71);
    pub const BC1_UNORM_SRGB: Self = Self(72);
    pub const BC2_UNORM: Self = Self(74);
    pub const BC2_UNORM_SRGB: Self = Self(75);
    pub const BC3_UNORM: Self = Self(77);
    pub const BC3_UNORM_SRGB: Self = Self(78);
    pub const BC4_UNORM: Self = Self(80);
    pub const BC4_SNORM: Self = Self(81);
    pub const BC5_UNORM: Self = Self(83);
    pub const BC5_SNORM: Self = Self(84);
    pub const B8G8R8A8_UNORM: Self = Self(87);
    pub const B8G8R8X8_UNORM: Self = Self(88);
    pub const B8G8R8A8_UNORM_SRGB: Self = Self(91);
    pub const BC6H_UF16: Self = Self(95);
    pub const BC6H_SF16: Self = Self(96);
    pub const BC7_UNORM: Self = Self(98);
    pub const BC7_UNORM_SRGB: Self = Self(99);

    /// Bytes per 4x4 block for block-compressed formats.
    pub fn block_bytes(self) -> Option<usize> {
        match self {
            Self::BC1_UNORM | Self::BC1_UNORM_SRGB | Self::BC4_UNORM | Self::BC4_SNORM => Some(8),
            Self::BC2_UNORM
            | Self::BC2_UNORM_SRGB
            | Self::BC3_UNORM
            | Self::BC3_UNORM_SRGB
            | Self::BC5_UNORM
            | Self::BC5_SNORM
            | Self::BC6H_UF16
            | Self::BC6H_SF16
            | Self::BC7_UNORM
            | Self::BC7_UNORM_SRGB => Some(16),
            _ => None,
        }
    }

    /// Bits per pixel for uncompressed formats.
    pub fn bits_per_pixel(self) -> Option<usize> {
        match self {
            Self::R8G8B8A8_UNORM
            | Self::R8G8B8A8_UNORM_SRGB
            | Self::B8G8R8A8_UNORM
            | Self::B8G8R8X8_UNORM
            | Self::B8G8R8A8_UNORM_SRGB => Some(32),
            Self::R8G8_UNORM => Some(16),
            Self::R8_UNORM => Some(8),
            _ => None,
        }
    }

    /// Whether the format is block compressed.
    pub fn is_compressed(self) -> bool {
        self.block_bytes().is_some()
    }

    /// Byte size of one surface at the given dimensions.
    ///
    /// `None` for formats without a known layout or when the size does not
    /// fit in `usize`.
    pub fn surface_size(self, width: u32, height: u32) -> Option<usize> {
        let (w, h) = (width.max(1) as usize, height.max(1) as usize);
        if let Some(block) = self.block_bytes() {
            return w.div_ceil(4).checked_mul(h.div_ceil(4))?.checked_mul(block);
        }
        let bpp = self.bits_per_pixel()?;
        Some(w.checked_mul(h)?.checked_mul(bpp)? / 8)
    }

    /// Row pitch (uncompressed) or linear size of the top mip (compressed),
    /// the value DDS stores in `pitch_or_linear_size`.
    pub fn pitch_or_linear_size(self, width: u32, height: u32) -> Option<usize> {
        if self.is_compressed() {
            return self.surface_size(width, height);
        }
        self.bits_per_pixel()
            .map(|bpp| (width.max(1) as usize * bpp).div_ceil(8))
    }

    /// Byte size of a full mip chain for one face.
    pub fn mip_chain_size(self, width: u32, height: u32, mip_count: u32) -> Option<usize> {
        (0..mip_count.max(1)).try_fold(0usize, |total, level| {
            let w = width.checked_shr(level).unwrap_or(0);
            let h = height.checked_shr(level).unwrap_or(0);
            total.checked_add(self.surface_size(w, h)?)
        })
    }

    /// Whether the format has a known surface layout.
    pub fn has_layout(self) -> bool {
        self.block_bytes().is_some() || self.bits_per_pixel().is_some()
    }

    /// Legacy (pre-DX10) pixel format for this DXGI format, if one exists.
    ///
    /// sRGB and BC6H/BC7 formats have no legacy encoding and need the DX10
    /// extension header.
    pub fn legacy_pixel_format(self) -> Option<DdsPixelFormat> {
        let rgb = DdsPixelFormat::RGB;
        let rgba = DdsPixelFormat::RGB | DdsPixelFormat::ALPHAPIXELS;
        let pf = match self {
            Self::BC1_UNORM => DdsPixelFormat::four_cc(FourCC::DXT1),
            Self::BC2_UNORM => DdsPixelFormat::four_cc(FourCC::DXT3),
            Self::BC3_UNORM => DdsPixelFormat::four_cc(FourCC::DXT5),
            Self::BC4_UNORM => DdsPixelFormat::four_cc(FourCC::BC4U),
            Self::BC4_SNORM => DdsPixelFormat::four_cc(FourCC::BC4S),
            Self::BC5_UNORM => DdsPixelFormat::four_cc(FourCC::ATI2),
            Self::BC5_SNORM => DdsPixelFormat::four_cc(FourCC::BC5S),
            Self::B8G8R8A8_UNORM => {
                DdsPixelFormat::masked(rgba, 32, [0xFF_0000, 0xFF00, 0xFF, 0xFF00_0000])
            }
            Self::B8G8R8X8_UNORM => DdsPixelFormat::masked(rgb, 32, [0xFF_0000, 0xFF00, 0xFF, 0]),
            Self::R8G8B8A8_UNORM => {
                DdsPixelFormat::masked(rgba, 32, [0xFF, 0xFF00, 0xFF_0000, 0xFF00_0000])
            }
            Self::R8_UNORM => DdsPixelFormat::masked(DdsPixelFormat::LUMINANCE, 8, [0xFF, 0, 0, 0]),
            _ => return None,
        };
        Some(pf)
    }

    /// Recover the DXGI format from a legacy pixel format.
    pub fn from_legacy(pf: &DdsPixelFormat) -> Option<Self> {
        if pf.flags & DdsPixelFormat::FOURCC != 0 {
            return match pf.four_cc {
                FourCC::DXT1 => Some(Self::BC1_UNORM),
                FourCC::DXT3 => Some(Self::BC2_UNORM),
                FourCC::DXT5 => Some(Self::BC3_UNORM),
                FourCC::BC4U => Some(Self::BC4_UNORM),
                FourCC::BC4S => Some(Self::BC4_SNORM),
                FourCC::ATI2 | FourCC::BC5U => Some(Self::BC5_UNORM),
                FourCC::BC5S => Some(Self::BC5_SNORM),
                _ => None,
            };
        }
        [
            Self::B8G8R8A8_UNORM,
            Self::B8G8R8X8_UNORM,
            Self::R8G8B8A8_UNORM,
            Self::R8_UNORM,
        ]
        .into_iter()
        .find(|format| format.legacy_pixel_format().as_ref() == Some(pf))
    }
}

impl std::fmt::Display for DxgiFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
            Self::R8G8B8A8_UNORM_SRGB => "R8G8B8A8_UNORM_SRGB",
            Self::R8G8_UNORM => "R8G8_UNORM",
            Self::R8_UNORM => "R8_UNORM",
            Self::BC1_UNORM => "BC1_UNORM",
            Self::BC1_UNORM_SRGB => "BC1_UNORM_SRGB",
            Self::BC2_UNORM => "BC2_UNORM",
            Self::BC2_UNORM_SRGB => "BC2_UNORM_SRGB",
            Self::BC3_UNORM => "BC3_UNORM",
            Self::BC3_UNORM_SRGB => "BC3_UNORM_SRGB",
            Self::BC4_UNORM => "BC4_UNORM",
            Self::BC4_SNORM => "BC4_SNORM",
            Self::BC5_UNORM => "BC5_UNORM",
            Self::BC5_SNORM => "BC5_SNORM",
            Self::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
            Self::B8G8R8X8_UNORM => "B8G8R8X8_UNORM",
            Self::B8G8R8A8_UNORM_SRGB => "B8G8R8A8_UNORM_SRGB",
            Self::BC6H_UF16 => "BC6H_UF16",
            Self::BC6H_SF16 => "BC6H_SF16",
            Self::BC7_UNORM => "BC7_UNORM",
            Self::BC7_UNORM_SRGB => "BC7_UNORM_SRGB",
            Self(other) => return write!(f, "DXGI({})", other),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_calculation() {
        // 4x4 block minimum
        assert_eq!(DxgiFormat::BC7_UNORM.surface_size(1, 1), Some(16));
        assert_eq!(DxgiFormat::BC7_UNORM.surface_size(4, 4), Some(16));
        assert_eq!(DxgiFormat::BC7_UNORM.surface_size(8, 8), Some(64));
        assert_eq!(DxgiFormat::BC1_UNORM.surface_size(1024, 1024), Some(512 * 1024));
        assert_eq!(DxgiFormat::R8G8B8A8_UNORM.surface_size(2, 3), Some(24));
        assert_eq!(DxgiFormat(2).surface_size(4, 4), None);
    }

    #[test]
    fn test_mip_chain_size() {
        // 16x16 BC1: 128 + 32 + 8 + 8 + 8
        assert_eq!(DxgiFormat::BC1_UNORM.mip_chain_size(16, 16, 5), Some(184));
        // levels past the 32nd stay at the 1x1 floor
        assert_eq!(
            DxgiFormat::BC1_UNORM.mip_chain_size(4, 4, 40),
            Some(40 * 8)
        );
    }

    #[test]
    fn test_oversized_surface() {
        assert_eq!(DxgiFormat::BC7_UNORM.surface_size(u32::MAX, u32::MAX), None);
        assert_eq!(DxgiFormat::R8G8B8A8_UNORM.surface_size(u32::MAX, u32::MAX), None);
        assert!(DxgiFormat::BC7_UNORM.has_layout());
        assert!(!DxgiFormat(2).has_layout());
    }

    #[test]
    fn test_legacy_round_trip_for_known_formats() {
        for format in [
            DxgiFormat::BC1_UNORM,
            DxgiFormat::BC3_UNORM,
            DxgiFormat::BC5_UNORM,
            DxgiFormat::B8G8R8A8_UNORM,
            DxgiFormat::R8_UNORM,
        ] {
            let pf = format.legacy_pixel_format().unwrap();
            assert_eq!(DxgiFormat::from_legacy(&pf), Some(format));
        }
        assert!(DxgiFormat::BC7_UNORM.legacy_pixel_format().is_none());
    }
}

//! Pixel format table and classifier.
//!
//! Every supported device format has exactly one row in `FORMAT_TABLE`.
//! The row carries the format family and the capability flags that decide how
//! the renderer samples and uploads it. Codes outside the table classify as
//! unsupported; callers must reject them rather than guess a family.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color::ColorAttributes;
use crate::error::FormatError;
use crate::fourcc::FourCc;
use crate::gpu::GpuCapabilities;

/// Layout family of a pixel format. Selects the render variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatFamily {
    /// Interleaved luma/chroma in a single plane (YUYV, AYUV32 ...).
    PackedYuv,
    /// Three separate Y, Cb and Cr planes.
    PlanarYuv,
    /// Luma plane plus one interleaved chroma plane (NV12 ...).
    SemiplanarNv,
    RgbPacked,
    BayerMosaic,
    GreyOrDepth,
    Hsv,
}

impl FormatFamily {
    /// Families whose samples are RGB-like: no Y'CbCr matrix applies.
    pub fn is_rgb_like(self) -> bool {
        matches!(self, Self::RgbPacked | Self::BayerMosaic | Self::GreyOrDepth)
    }

    /// Families that carry a Y'CbCr matrix encoding.
    pub fn is_luma_chroma(self) -> bool {
        matches!(self, Self::PackedYuv | Self::PlanarYuv | Self::SemiplanarNv)
    }
}

/// Chroma subsampling ratio of a luma/chroma format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChromaSubsampling {
    S420,
    S422,
    S444,
}

impl ChromaSubsampling {
    /// Horizontal and vertical divisors applied to the luma size.
    pub fn factors(self) -> (u32, u32) {
        match self {
            Self::S420 => (2, 2),
            Self::S422 => (2, 1),
            Self::S444 => (1, 1),
        }
    }
}

impl fmt::Display for ChromaSubsampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::S420 => "4:2:0",
            Self::S422 => "4:2:2",
            Self::S444 => "4:4:4",
        })
    }
}

/// Every pixel format the viewer can display.
///
/// The discriminant order matches `FORMAT_TABLE`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Yuyv,
    Yvyu,
    Uyvy,
    Vyuy,
    Yuv422P,
    Yvu420,
    Yuv420,
    Nv12,
    Nv21,
    Nv16,
    Nv61,
    Nv24,
    Nv42,
    Nv16M,
    Nv61M,
    Yvu420M,
    Yuv420M,
    Yvu422M,
    Yuv422M,
    Yvu444M,
    Yuv444M,
    Nv12M,
    Nv21M,
    Yuv444,
    Yuv555,
    Yuv565,
    Yuv32,
    Ayuv32,
    Xyuv32,
    Vuya32,
    Vuyx32,
    Rgb32,
    Xrgb32,
    Argb32,
    Rgbx32,
    Rgba32,
    Bgr32,
    Xbgr32,
    Abgr32,
    Bgrx32,
    Bgra32,
    Rgb24,
    Bgr24,
    Rgb565,
    Rgb565X,
    Rgb444,
    Xrgb444,
    Argb444,
    Xbgr444,
    Abgr444,
    Rgbx444,
    Rgba444,
    Bgrx444,
    Bgra444,
    Rgb555,
    Xrgb555,
    Argb555,
    Rgb555X,
    Xrgb555X,
    Argb555X,
    Rgbx555,
    Rgba555,
    Xbgr555,
    Abgr555,
    Bgrx555,
    Bgra555,
    Rgb332,
    Bgr666,
    Sbggr8,
    Sgbrg8,
    Sgrbg8,
    Srggb8,
    Sbggr10,
    Sgbrg10,
    Sgrbg10,
    Srggb10,
    Sbggr12,
    Sgbrg12,
    Sgrbg12,
    Srggb12,
    Sbggr16,
    Sgbrg16,
    Sgrbg16,
    Srggb16,
    Hsv24,
    Hsv32,
    Grey,
    Y10,
    Y12,
    Y16,
    Y16Be,
    Z16,
}

impl PixelFormat {
    fn entry(self) -> &'static FormatEntry {
        &FORMAT_TABLE[self as usize]
    }

    pub fn fourcc(self) -> FourCc {
        self.entry().fourcc
    }

    /// Human-readable description, e.g. `"Y/UV 4:2:0"`.
    pub fn description(self) -> &'static str {
        self.entry().description
    }

    pub fn from_fourcc(code: FourCc) -> Option<Self> {
        FORMAT_TABLE
            .iter()
            .find(|e| e.fourcc == code)
            .map(|e| e.descriptor.format)
    }

    pub fn descriptor(self) -> FormatDescriptor {
        self.entry().descriptor
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {}", self.fourcc(), self.description())
    }
}

/// Derived, immutable description of a pixel format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format: PixelFormat,
    pub family: FormatFamily,
    /// Luma and mosaic planes are uploaded single-channel and sampled via red.
    pub uses_red_channel_sampling: bool,
    /// GPU-side sRGB decode may be requested for this format.
    pub accepts_linear_to_srgb: bool,
    /// Valid only when the driver can swap bytes on upload.
    pub requires_byte_swap_support: bool,
    /// Valid only on a full (non-embedded) graphics profile.
    pub requires_desktop_profile: bool,
    /// Chroma subsampling of luma/chroma formats.
    pub chroma: Option<ChromaSubsampling>,
    /// Cr is stored before Cb.
    pub swap_chroma: bool,
    /// Bytes per pixel of the first (luma for planar) plane.
    pub bytes_per_pixel: u8,
    /// Number of separate device memory planes.
    pub mem_planes: u8,
}

impl FormatDescriptor {
    pub fn fourcc(&self) -> FourCc {
        self.format.fourcc()
    }

    /// Check the format against the capabilities of the running GPU context.
    pub fn check_gate(&self, caps: &dyn GpuCapabilities) -> Result<(), FormatError> {
        if self.requires_byte_swap_support && !caps.supports_byte_swap() {
            return Err(FormatError::NeedsByteSwap {
                fourcc: self.fourcc(),
            });
        }
        if self.requires_desktop_profile && caps.is_constrained_profile() {
            return Err(FormatError::NeedsDesktopProfile {
                fourcc: self.fourcc(),
            });
        }
        Ok(())
    }

    /// The effective descriptor once color attributes are resolved.
    ///
    /// GPU sRGB decode assumes full-range sRGB-encoded input, so it is
    /// withdrawn for limited-range data or any other transfer function.
    pub fn with_color(&self, color: &ColorAttributes) -> FormatDescriptor {
        let mut effective = *self;
        if !color.allows_srgb_decode() {
            effective.accepts_linear_to_srgb = false;
        }
        effective
    }
}

/// Look up the descriptor for a device format code.
///
/// Returns `None` for codes outside the supported table.
pub fn classify(code: FourCc) -> Option<FormatDescriptor> {
    PixelFormat::from_fourcc(code).map(PixelFormat::descriptor)
}

/// All supported formats in table order.
pub fn supported_formats() -> impl Iterator<Item = PixelFormat> {
    FORMAT_TABLE.iter().map(|e| e.descriptor.format)
}

// ── Table ────────────────────────────────────────────────────────────

struct FormatEntry {
    fourcc: FourCc,
    description: &'static str,
    descriptor: FormatDescriptor,
}

impl FormatEntry {
    const fn srgb(mut self) -> Self {
        self.descriptor.accepts_linear_to_srgb = true;
        self
    }

    const fn byte_swap(mut self) -> Self {
        self.descriptor.requires_byte_swap_support = true;
        self
    }

    const fn desktop(mut self) -> Self {
        self.descriptor.requires_desktop_profile = true;
        self
    }

    const fn chroma(mut self, chroma: ChromaSubsampling) -> Self {
        self.descriptor.chroma = Some(chroma);
        self
    }

    const fn crcb(mut self) -> Self {
        self.descriptor.swap_chroma = true;
        self
    }

    const fn planes(mut self, mem_planes: u8) -> Self {
        self.descriptor.mem_planes = mem_planes;
        self
    }
}

const fn row(
    format: PixelFormat,
    fourcc: FourCc,
    description: &'static str,
    family: FormatFamily,
    bytes_per_pixel: u8,
) -> FormatEntry {
    let uses_red_channel_sampling = matches!(
        family,
        FormatFamily::PlanarYuv
            | FormatFamily::SemiplanarNv
            | FormatFamily::BayerMosaic
            | FormatFamily::GreyOrDepth
    );
    FormatEntry {
        fourcc,
        description,
        descriptor: FormatDescriptor {
            format,
            family,
            uses_red_channel_sampling,
            accepts_linear_to_srgb: false,
            requires_byte_swap_support: false,
            requires_desktop_profile: false,
            chroma: None,
            swap_chroma: false,
            bytes_per_pixel,
            mem_planes: 1,
        },
    }
}

use ChromaSubsampling::{S420, S422, S444};
use FormatFamily::{
    BayerMosaic as Bayer, GreyOrDepth as Grey, Hsv, PackedYuv as Packed, PlanarYuv as Planar,
    RgbPacked as Rgb, SemiplanarNv as Nv,
};
use PixelFormat as P;

const fn cc(code: &[u8; 4]) -> FourCc {
    FourCc::new(code)
}

static FORMAT_TABLE: [FormatEntry; 92] = [
    // Packed Y'CbCr
    row(P::Yuyv, cc(b"YUYV"), "YUYV 4:2:2", Packed, 2).chroma(S422),
    row(P::Yvyu, cc(b"YVYU"), "YVYU 4:2:2", Packed, 2).chroma(S422).crcb(),
    row(P::Uyvy, cc(b"UYVY"), "UYVY 4:2:2", Packed, 2).chroma(S422),
    row(P::Vyuy, cc(b"VYUY"), "VYUY 4:2:2", Packed, 2).chroma(S422).crcb(),
    // Planar Y'CbCr
    row(P::Yuv422P, cc(b"422P"), "Planar YUV 4:2:2", Planar, 1).chroma(S422),
    row(P::Yvu420, cc(b"YV12"), "Planar YVU 4:2:0", Planar, 1).chroma(S420).crcb(),
    row(P::Yuv420, cc(b"YU12"), "Planar YUV 4:2:0", Planar, 1).chroma(S420),
    // Semiplanar
    row(P::Nv12, cc(b"NV12"), "Y/UV 4:2:0", Nv, 1).chroma(S420),
    row(P::Nv21, cc(b"NV21"), "Y/VU 4:2:0", Nv, 1).chroma(S420).crcb(),
    row(P::Nv16, cc(b"NV16"), "Y/UV 4:2:2", Nv, 1).chroma(S422),
    row(P::Nv61, cc(b"NV61"), "Y/VU 4:2:2", Nv, 1).chroma(S422).crcb(),
    row(P::Nv24, cc(b"NV24"), "Y/UV 4:4:4", Nv, 1).chroma(S444),
    row(P::Nv42, cc(b"NV42"), "Y/VU 4:4:4", Nv, 1).chroma(S444).crcb(),
    row(P::Nv16M, cc(b"NM16"), "Y/UV 4:2:2 (N-C)", Nv, 1).chroma(S422).planes(2),
    row(P::Nv61M, cc(b"NM61"), "Y/VU 4:2:2 (N-C)", Nv, 1).chroma(S422).crcb().planes(2),
    // Multi-planar Y'CbCr
    row(P::Yvu420M, cc(b"YM21"), "Planar YVU 4:2:0 (N-C)", Planar, 1).chroma(S420).crcb().planes(3),
    row(P::Yuv420M, cc(b"YM12"), "Planar YUV 4:2:0 (N-C)", Planar, 1).chroma(S420).planes(3),
    row(P::Yvu422M, cc(b"YM61"), "Planar YVU 4:2:2 (N-C)", Planar, 1).chroma(S422).crcb().planes(3),
    row(P::Yuv422M, cc(b"YM16"), "Planar YUV 4:2:2 (N-C)", Planar, 1).chroma(S422).planes(3),
    row(P::Yvu444M, cc(b"YM42"), "Planar YVU 4:4:4 (N-C)", Planar, 1).chroma(S444).crcb().planes(3),
    row(P::Yuv444M, cc(b"YM24"), "Planar YUV 4:4:4 (N-C)", Planar, 1).chroma(S444).planes(3),
    row(P::Nv12M, cc(b"NM12"), "Y/UV 4:2:0 (N-C)", Nv, 1).chroma(S420).planes(2),
    row(P::Nv21M, cc(b"NM21"), "Y/VU 4:2:0 (N-C)", Nv, 1).chroma(S420).crcb().planes(2),
    // Packed 4:4:4 Y'CbCr
    row(P::Yuv444, cc(b"Y444"), "16-bit A/XYUV 4-4-4-4", Packed, 2).chroma(S444),
    row(P::Yuv555, cc(b"YUVO"), "16-bit A/XYUV 1-5-5-5", Packed, 2).chroma(S444).desktop(),
    row(P::Yuv565, cc(b"YUVP"), "16-bit YUV 5-6-5", Packed, 2).chroma(S444),
    row(P::Yuv32, cc(b"YUV4"), "32-bit A/XYUV 8-8-8-8", Packed, 4).chroma(S444),
    row(P::Ayuv32, cc(b"AYUV"), "32-bit AYUV 8-8-8-8", Packed, 4).chroma(S444),
    row(P::Xyuv32, cc(b"XYUV"), "32-bit XYUV 8-8-8-8", Packed, 4).chroma(S444),
    row(P::Vuya32, cc(b"VUYA"), "32-bit VUYA 8-8-8-8", Packed, 4).chroma(S444),
    row(P::Vuyx32, cc(b"VUYX"), "32-bit VUYX 8-8-8-8", Packed, 4).chroma(S444),
    // 32-bit RGB
    row(P::Rgb32, cc(b"RGB4"), "32-bit A/XRGB 8-8-8-8", Rgb, 4),
    row(P::Xrgb32, cc(b"BX24"), "32-bit XRGB 8-8-8-8", Rgb, 4),
    row(P::Argb32, cc(b"BA24"), "32-bit ARGB 8-8-8-8", Rgb, 4),
    row(P::Rgbx32, cc(b"XB24"), "32-bit RGBX 8-8-8-8", Rgb, 4),
    row(P::Rgba32, cc(b"AB24"), "32-bit RGBA 8-8-8-8", Rgb, 4),
    row(P::Bgr32, cc(b"BGR4"), "32-bit BGRA/X 8-8-8-8", Rgb, 4),
    row(P::Xbgr32, cc(b"XR24"), "32-bit BGRX 8-8-8-8", Rgb, 4),
    row(P::Abgr32, cc(b"AR24"), "32-bit BGRA 8-8-8-8", Rgb, 4),
    row(P::Bgrx32, cc(b"RX24"), "32-bit XBGR 8-8-8-8", Rgb, 4),
    row(P::Bgra32, cc(b"RA24"), "32-bit ABGR 8-8-8-8", Rgb, 4),
    // 24-bit and smaller RGB
    row(P::Rgb24, cc(b"RGB3"), "24-bit RGB 8-8-8", Rgb, 3).srgb(),
    row(P::Bgr24, cc(b"BGR3"), "24-bit BGR 8-8-8", Rgb, 3).srgb(),
    row(P::Rgb565, cc(b"RGBP"), "16-bit RGB 5-6-5", Rgb, 2).srgb(),
    row(P::Rgb565X, cc(b"RGBR"), "16-bit RGB 5-6-5 BE", Rgb, 2).srgb().byte_swap(),
    row(P::Rgb444, cc(b"R444"), "16-bit A/XRGB 4-4-4-4", Rgb, 2).srgb(),
    row(P::Xrgb444, cc(b"XR12"), "16-bit XRGB 4-4-4-4", Rgb, 2).srgb(),
    row(P::Argb444, cc(b"AR12"), "16-bit ARGB 4-4-4-4", Rgb, 2).srgb(),
    row(P::Xbgr444, cc(b"XB12"), "16-bit XBGR 4-4-4-4", Rgb, 2).srgb(),
    row(P::Abgr444, cc(b"AB12"), "16-bit ABGR 4-4-4-4", Rgb, 2).srgb(),
    row(P::Rgbx444, cc(b"RX12"), "16-bit RGBX 4-4-4-4", Rgb, 2).srgb(),
    row(P::Rgba444, cc(b"RA12"), "16-bit RGBA 4-4-4-4", Rgb, 2).srgb(),
    row(P::Bgrx444, cc(b"BX12"), "16-bit BGRX 4-4-4-4", Rgb, 2).srgb(),
    row(P::Bgra444, cc(b"GA12"), "16-bit BGRA 4-4-4-4", Rgb, 2).srgb(),
    row(P::Rgb555, cc(b"RGBO"), "16-bit A/XRGB 1-5-5-5", Rgb, 2).srgb().desktop(),
    row(P::Xrgb555, cc(b"XR15"), "16-bit XRGB 1-5-5-5", Rgb, 2).srgb().desktop(),
    row(P::Argb555, cc(b"AR15"), "16-bit ARGB 1-5-5-5", Rgb, 2).srgb().desktop(),
    row(P::Rgb555X, cc(b"RGBQ"), "16-bit A/XRGB 1-5-5-5 BE", Rgb, 2).srgb().desktop(),
    row(P::Xrgb555X, FourCc::new_be(b"XR15"), "16-bit XRGB 1-5-5-5 BE", Rgb, 2).srgb().desktop(),
    row(P::Argb555X, FourCc::new_be(b"AR15"), "16-bit ARGB 1-5-5-5 BE", Rgb, 2).srgb().desktop(),
    row(P::Rgbx555, cc(b"RX15"), "16-bit RGBX 5-5-5-1", Rgb, 2).srgb().desktop(),
    row(P::Rgba555, cc(b"RA15"), "16-bit RGBA 5-5-5-1", Rgb, 2).srgb().desktop(),
    row(P::Xbgr555, cc(b"XB15"), "16-bit XBGR 1-5-5-5", Rgb, 2).srgb().desktop(),
    row(P::Abgr555, cc(b"AB15"), "16-bit ABGR 1-5-5-5", Rgb, 2).srgb().desktop(),
    row(P::Bgrx555, cc(b"BX15"), "16-bit BGRX 5-5-5-1", Rgb, 2).srgb().desktop(),
    row(P::Bgra555, cc(b"BA15"), "16-bit BGRA 5-5-5-1", Rgb, 2).srgb().desktop(),
    row(P::Rgb332, cc(b"RGB1"), "8-bit RGB 3-3-2", Rgb, 1).srgb().desktop(),
    row(P::Bgr666, cc(b"BGRH"), "18-bit BGRX 6-6-6-14", Rgb, 4).srgb().desktop(),
    // Bayer
    row(P::Sbggr8, cc(b"BA81"), "8-bit Bayer BGBG/GRGR", Bayer, 1),
    row(P::Sgbrg8, cc(b"GBRG"), "8-bit Bayer GBGB/RGRG", Bayer, 1),
    row(P::Sgrbg8, cc(b"GRBG"), "8-bit Bayer GRGR/BGBG", Bayer, 1),
    row(P::Srggb8, cc(b"RGGB"), "8-bit Bayer RGRG/GBGB", Bayer, 1),
    row(P::Sbggr10, cc(b"BG10"), "10-bit Bayer BGBG/GRGR", Bayer, 2),
    row(P::Sgbrg10, cc(b"GB10"), "10-bit Bayer GBGB/RGRG", Bayer, 2),
    row(P::Sgrbg10, cc(b"BA10"), "10-bit Bayer GRGR/BGBG", Bayer, 2),
    row(P::Srggb10, cc(b"RG10"), "10-bit Bayer RGRG/GBGB", Bayer, 2),
    row(P::Sbggr12, cc(b"BG12"), "12-bit Bayer BGBG/GRGR", Bayer, 2),
    row(P::Sgbrg12, cc(b"GB12"), "12-bit Bayer GBGB/RGRG", Bayer, 2),
    row(P::Sgrbg12, cc(b"BA12"), "12-bit Bayer GRGR/BGBG", Bayer, 2),
    row(P::Srggb12, cc(b"RG12"), "12-bit Bayer RGRG/GBGB", Bayer, 2),
    row(P::Sbggr16, cc(b"BYR2"), "16-bit Bayer BGBG/GRGR", Bayer, 2),
    row(P::Sgbrg16, cc(b"GB16"), "16-bit Bayer GBGB/RGRG", Bayer, 2),
    row(P::Sgrbg16, cc(b"GR16"), "16-bit Bayer GRGR/BGBG", Bayer, 2),
    row(P::Srggb16, cc(b"RG16"), "16-bit Bayer RGRG/GBGB", Bayer, 2),
    // HSV
    row(P::Hsv24, cc(b"HSV3"), "24-bit HSV 8-8-8", Hsv, 3),
    row(P::Hsv32, cc(b"HSV4"), "32-bit XHSV 8-8-8-8", Hsv, 4),
    // Grey and depth
    row(P::Grey, cc(b"GREY"), "8-bit Greyscale", Grey, 1),
    row(P::Y10, cc(b"Y10 "), "10-bit Greyscale", Grey, 2),
    row(P::Y12, cc(b"Y12 "), "12-bit Greyscale", Grey, 2),
    row(P::Y16, cc(b"Y16 "), "16-bit Greyscale", Grey, 2),
    row(P::Y16Be, FourCc::new_be(b"Y16 "), "16-bit Greyscale BE", Grey, 2).byte_swap(),
    row(P::Z16, cc(b"Z16 "), "16-bit Depth", Grey, 2),
];

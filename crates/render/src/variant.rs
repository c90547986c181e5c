//! Render variants and their texture upload plans.
//!
//! A variant is the shading and upload strategy for one format family. It is
//! a pure function of the format descriptor; the plan then says which bytes
//! of which memory plane feed which texture.

use serde::{Deserialize, Serialize};
use std::fmt;

use vc_capture::DeviceFormat;
use vc_common::{ChromaSubsampling, ColorAttributes, FormatDescriptor, FormatFamily, FourCc};

/// Shading strategy, one per format family.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderVariant {
    PackedYuv,
    PlanarYuv,
    SemiplanarNv(ChromaSubsampling),
    /// Packed RGB and single-channel grey/depth.
    Rgb,
    Bayer,
    Hsv,
}

impl RenderVariant {
    /// Pick the variant for a format.
    pub fn select(desc: &FormatDescriptor) -> Self {
        match desc.family {
            FormatFamily::PackedYuv => Self::PackedYuv,
            FormatFamily::PlanarYuv => Self::PlanarYuv,
            FormatFamily::SemiplanarNv => {
                Self::SemiplanarNv(desc.chroma.unwrap_or(ChromaSubsampling::S420))
            }
            FormatFamily::RgbPacked | FormatFamily::GreyOrDepth => Self::Rgb,
            FormatFamily::BayerMosaic => Self::Bayer,
            FormatFamily::Hsv => Self::Hsv,
        }
    }
}

impl fmt::Display for RenderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PackedYuv => f.write_str("packed-yuv"),
            Self::PlanarYuv => f.write_str("planar-yuv"),
            Self::SemiplanarNv(s) => write!(f, "semiplanar-nv {s}"),
            Self::Rgb => f.write_str("rgb"),
            Self::Bayer => f.write_str("bayer"),
            Self::Hsv => f.write_str("hsv"),
        }
    }
}

/// What a texture holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureRole {
    /// Luma, or the only channel of a grey format.
    Luma,
    Cb,
    Cr,
    /// Interleaved chroma pairs; `swapped` when Cr comes first.
    Chroma { swapped: bool },
    /// Whole pixels in one texture (packed YUV, RGB, HSV).
    Interleaved,
    /// Raw color filter array samples.
    Mosaic,
}

/// One texture upload: a byte range of a memory plane and its shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureSpec {
    pub role: TextureRole,
    /// Memory plane the bytes come from.
    pub plane: usize,
    /// Byte offset of the texture inside that plane.
    pub offset: usize,
    pub width: u32,
    pub height: u32,
    pub bytes_per_line: u32,
    /// Sampled through the red channel only.
    pub red_only: bool,
    /// Upload with GPU sRGB decoding.
    pub srgb_decode: bool,
    /// Swap 16-bit texel bytes on upload.
    pub byte_swap: bool,
}

impl TextureSpec {
    pub fn byte_len(&self) -> usize {
        self.bytes_per_line as usize * self.height as usize
    }
}

/// Everything that decides which GPU program is built.
///
/// Any difference between two specs forces a program rebuild.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSpec {
    pub variant: RenderVariant,
    pub fourcc: FourCc,
    pub color: ColorAttributes,
    pub width: u32,
    pub height: u32,
    pub textures: Vec<TextureSpec>,
}

impl ProgramSpec {
    pub fn new(desc: &FormatDescriptor, color: &ColorAttributes, format: &DeviceFormat) -> Self {
        Self {
            variant: RenderVariant::select(desc),
            fourcc: desc.fourcc(),
            color: *color,
            width: format.width,
            height: format.height,
            textures: plan_textures(desc, format),
        }
    }
}

/// Lay out the textures for one frame of `format`.
pub fn plan_textures(desc: &FormatDescriptor, format: &DeviceFormat) -> Vec<TextureSpec> {
    let (width, height) = (format.width, format.height);
    let line = |plane: usize, fallback: u32| {
        format
            .planes
            .get(plane)
            .map_or(fallback, |p| p.bytes_per_line)
    };
    let luma_line = line(0, width * u32::from(desc.bytes_per_pixel));
    let base = TextureSpec {
        role: TextureRole::Interleaved,
        plane: 0,
        offset: 0,
        width,
        height,
        bytes_per_line: luma_line,
        red_only: desc.uses_red_channel_sampling,
        srgb_decode: desc.accepts_linear_to_srgb,
        byte_swap: desc.requires_byte_swap_support,
    };

    let (h, v) = desc.chroma.map_or((1, 1), |c| c.factors());
    let chroma_width = width / h;
    let chroma_height = height / v;
    let multi_planar = desc.mem_planes > 1;
    let luma_size = luma_line as usize * height as usize;

    match desc.family {
        FormatFamily::PlanarYuv => {
            let chroma_line = line(1, luma_line / h);
            let chroma_size = chroma_line as usize * chroma_height as usize;
            let (first, second) = if desc.swap_chroma {
                (TextureRole::Cr, TextureRole::Cb)
            } else {
                (TextureRole::Cb, TextureRole::Cr)
            };
            let chroma = |role, index: usize| TextureSpec {
                role,
                plane: if multi_planar { index + 1 } else { 0 },
                offset: if multi_planar {
                    0
                } else {
                    luma_size + index * chroma_size
                },
                width: chroma_width,
                height: chroma_height,
                bytes_per_line: chroma_line,
                ..base
            };
            let mut textures = vec![
                TextureSpec {
                    role: TextureRole::Luma,
                    ..base
                },
                chroma(first, 0),
                chroma(second, 1),
            ];
            // Canonical Y, Cb, Cr order regardless of storage order.
            textures.sort_by_key(|t| match t.role {
                TextureRole::Luma => 0,
                TextureRole::Cb => 1,
                _ => 2,
            });
            textures
        }
        FormatFamily::SemiplanarNv => vec![
            TextureSpec {
                role: TextureRole::Luma,
                ..base
            },
            TextureSpec {
                role: TextureRole::Chroma {
                    swapped: desc.swap_chroma,
                },
                plane: usize::from(multi_planar),
                offset: if multi_planar { 0 } else { luma_size },
                width: chroma_width,
                height: chroma_height,
                bytes_per_line: line(1, luma_line / h * 2),
                ..base
            },
        ],
        FormatFamily::GreyOrDepth => vec![TextureSpec {
            role: TextureRole::Luma,
            ..base
        }],
        FormatFamily::BayerMosaic => vec![TextureSpec {
            role: TextureRole::Mosaic,
            ..base
        }],
        FormatFamily::PackedYuv | FormatFamily::RgbPacked | FormatFamily::Hsv => vec![base],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_common::{supported_formats, PixelFormat};

    fn plan(format: PixelFormat) -> Vec<TextureSpec> {
        let dev = DeviceFormat::new(format, 64, 32, ColorAttributes::default());
        plan_textures(&format.descriptor(), &dev)
    }

    // ── Selection ────────────────────────────────────────────────

    #[test]
    fn one_variant_per_family() {
        let cases = [
            (PixelFormat::Yuyv, RenderVariant::PackedYuv),
            (PixelFormat::Yuv420, RenderVariant::PlanarYuv),
            (PixelFormat::Nv16, RenderVariant::SemiplanarNv(ChromaSubsampling::S422)),
            (PixelFormat::Nv24, RenderVariant::SemiplanarNv(ChromaSubsampling::S444)),
            (PixelFormat::Rgb24, RenderVariant::Rgb),
            (PixelFormat::Y16, RenderVariant::Rgb),
            (PixelFormat::Sgrbg10, RenderVariant::Bayer),
            (PixelFormat::Hsv32, RenderVariant::Hsv),
        ];
        for (format, variant) in cases {
            assert_eq!(RenderVariant::select(&format.descriptor()), variant, "{format}");
        }
    }

    #[test]
    fn selection_is_total() {
        for format in supported_formats() {
            let _ = RenderVariant::select(&format.descriptor());
            assert!(!plan(format).is_empty(), "{format}");
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(
            RenderVariant::SemiplanarNv(ChromaSubsampling::S420).to_string(),
            "semiplanar-nv 4:2:0"
        );
        assert_eq!(RenderVariant::Bayer.to_string(), "bayer");
    }

    // ── Texture plans ────────────────────────────────────────────

    #[test]
    fn planar_contiguous_offsets() {
        let t = plan(PixelFormat::Yuv420);
        assert_eq!(t.len(), 3);
        assert_eq!(t[0].role, TextureRole::Luma);
        assert_eq!((t[1].role, t[1].offset), (TextureRole::Cb, 64 * 32));
        assert_eq!((t[2].role, t[2].offset), (TextureRole::Cr, 64 * 32 + 32 * 16));
        assert!(t.iter().all(|t| t.plane == 0 && t.red_only));
    }

    #[test]
    fn yvu_reorders_to_canonical() {
        let t = plan(PixelFormat::Yvu420);
        assert_eq!(t[1].role, TextureRole::Cb);
        // Cr is stored first.
        assert_eq!(t[1].offset, 64 * 32 + 32 * 16);
        assert_eq!(t[2].offset, 64 * 32);
    }

    #[test]
    fn multiplanar_uses_plane_indices() {
        let t = plan(PixelFormat::Yvu422M);
        assert_eq!(t[1].role, TextureRole::Cb);
        assert_eq!((t[1].plane, t[1].offset), (2, 0));
        assert_eq!((t[2].plane, t[2].offset), (1, 0));
        assert_eq!(t[1].height, 32);
    }

    #[test]
    fn semiplanar_chroma() {
        let t = plan(PixelFormat::Nv21);
        assert_eq!(t.len(), 2);
        assert_eq!(t[1].role, TextureRole::Chroma { swapped: true });
        assert_eq!(t[1].offset, 64 * 32);
        assert_eq!((t[1].width, t[1].height, t[1].bytes_per_line), (32, 16, 64));

        let t = plan(PixelFormat::Nv12M);
        assert_eq!((t[1].plane, t[1].offset), (1, 0));
    }

    #[test]
    fn byte_sizes_fit_planes() {
        for format in supported_formats() {
            let dev = DeviceFormat::new(format, 64, 32, ColorAttributes::default());
            for t in plan_textures(&format.descriptor(), &dev) {
                let plane = dev.planes[t.plane].size_image as usize;
                assert!(t.offset + t.byte_len() <= plane, "{format} {:?}", t.role);
            }
        }
    }

    #[test]
    fn flags_follow_descriptor() {
        let t = plan(PixelFormat::Rgb24);
        assert!(t[0].srgb_decode);
        assert!(!t[0].red_only);
        let t = plan(PixelFormat::Y16Be);
        assert!(t[0].byte_swap);
        assert_eq!(t[0].role, TextureRole::Luma);
    }
}

//! Color attribute resolution.
//!
//! Turns the device-reported attributes plus the user's overrides into a
//! fully specified [`ColorAttributes`], then derives the effective format
//! descriptor from it. Resolution runs on every (re)negotiation and whenever
//! an override changes.

use serde::{Deserialize, Serialize};

use crate::color::{
    ColorAttributes, Colorspace, HsvEncoding, MatrixEncoding, OverrideSet, Quantization,
    TransferFunction,
};
use crate::format::{FormatDescriptor, FormatFamily};

/// Resolve the color attributes of a frame.
///
/// Overrides win outright. An unrecognized colorspace falls back to sRGB for
/// RGB-like families and Rec. 709 otherwise; the remaining unspecified fields
/// take the canonical defaults of the resolved colorspace. The result never
/// contains an `Unspecified` field.
pub fn resolve(
    reported: &ColorAttributes,
    family: FormatFamily,
    overrides: &OverrideSet,
) -> ColorAttributes {
    let mut colorspace = pick(overrides.colorspace, reported.colorspace, Colorspace::Unspecified);
    if !colorspace.is_recognized() {
        colorspace = if family.is_rgb_like() {
            Colorspace::Srgb
        } else {
            Colorspace::Rec709
        };
    }

    let mut transfer_function = pick(
        overrides.transfer_function,
        reported.transfer_function,
        TransferFunction::Unspecified,
    );
    if transfer_function == TransferFunction::Unspecified {
        transfer_function = colorspace.default_transfer_function();
    }

    let matrix_encoding = resolve_matrix(reported, family, overrides, colorspace);

    let mut quantization = pick(
        overrides.quantization,
        reported.quantization,
        Quantization::Unspecified,
    );
    if quantization == Quantization::Unspecified {
        quantization = default_quantization(family.is_rgb_like(), colorspace);
    }

    ColorAttributes {
        colorspace,
        transfer_function,
        matrix_encoding,
        quantization,
    }
}

fn pick<T: PartialEq + Copy>(overridden: T, reported: T, unspecified: T) -> T {
    if overridden != unspecified {
        overridden
    } else {
        reported
    }
}

fn resolve_matrix(
    reported: &ColorAttributes,
    family: FormatFamily,
    overrides: &OverrideSet,
    colorspace: Colorspace,
) -> MatrixEncoding {
    match family {
        // Hue range comes from the device.
        FormatFamily::Hsv => match reported.matrix_encoding {
            MatrixEncoding::Hsv(e) => MatrixEncoding::Hsv(e),
            _ => MatrixEncoding::Hsv(HsvEncoding::Hue180),
        },
        f if f.is_luma_chroma() => {
            let chosen = [overrides.matrix_encoding, reported.matrix_encoding]
                .into_iter()
                .find_map(|m| match m {
                    MatrixEncoding::YCbCr(e) => Some(e),
                    _ => None,
                })
                .unwrap_or_else(|| colorspace.default_ycbcr_encoding());
            MatrixEncoding::YCbCr(chosen)
        }
        _ => MatrixEncoding::Identity,
    }
}

/// Default quantization for a format with no reported or overridden range.
///
/// HSV is not RGB-like here and takes the limited-range default.
pub fn default_quantization(is_rgb: bool, colorspace: Colorspace) -> Quantization {
    if is_rgb && colorspace == Colorspace::Bt2020 {
        Quantization::LimitedRange
    } else if is_rgb || colorspace == Colorspace::Jpeg {
        Quantization::FullRange
    } else {
        Quantization::LimitedRange
    }
}

/// A negotiated format together with its resolved color interpretation.
///
/// `descriptor` is the effective one: sRGB decode has already been withdrawn
/// when the resolved attributes do not allow it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFormat {
    pub descriptor: FormatDescriptor,
    pub color: ColorAttributes,
}

impl ResolvedFormat {
    pub fn new(base: &FormatDescriptor, reported: &ColorAttributes, overrides: &OverrideSet) -> Self {
        let color = resolve(reported, base.family, overrides);
        Self {
            descriptor: base.with_color(&color),
            color,
        }
    }
}

//! Colorspace, transfer function, matrix encoding and quantization types.
//!
//! Each enum carries the numeric code the capture device reports and a short
//! name used by shells and preference files (`rec709`, `lim-range` ...).
//! `Unspecified` is the "device did not say / no override" sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ColorParseError;

// ── Colorspace ───────────────────────────────────────────────────────

/// Color primaries / colorspace.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Colorspace {
    #[default]
    Unspecified,
    Smpte170m,
    Smpte240m,
    Rec709,
    Bt878,
    System470M,
    System470Bg,
    Jpeg,
    Srgb,
    OpRgb,
    Bt2020,
    Raw,
    DciP3,
}

impl Colorspace {
    /// Every concrete colorspace a device or override may name.
    pub const ALL: [Colorspace; 12] = [
        Self::Smpte170m,
        Self::Smpte240m,
        Self::Rec709,
        Self::Bt878,
        Self::System470M,
        Self::System470Bg,
        Self::Jpeg,
        Self::Srgb,
        Self::OpRgb,
        Self::Bt2020,
        Self::Raw,
        Self::DciP3,
    ];

    /// The colorspaces the renderer knows how to convert from.
    pub const RECOGNIZED: [Colorspace; 9] = [
        Self::Smpte170m,
        Self::Smpte240m,
        Self::Rec709,
        Self::System470M,
        Self::System470Bg,
        Self::Srgb,
        Self::OpRgb,
        Self::DciP3,
        Self::Bt2020,
    ];

    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Smpte170m,
            2 => Self::Smpte240m,
            3 => Self::Rec709,
            4 => Self::Bt878,
            5 => Self::System470M,
            6 => Self::System470Bg,
            7 => Self::Jpeg,
            8 => Self::Srgb,
            9 => Self::OpRgb,
            10 => Self::Bt2020,
            11 => Self::Raw,
            12 => Self::DciP3,
            _ => Self::Unspecified,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Smpte170m => 1,
            Self::Smpte240m => 2,
            Self::Rec709 => 3,
            Self::Bt878 => 4,
            Self::System470M => 5,
            Self::System470Bg => 6,
            Self::Jpeg => 7,
            Self::Srgb => 8,
            Self::OpRgb => 9,
            Self::Bt2020 => 10,
            Self::Raw => 11,
            Self::DciP3 => 12,
        }
    }

    pub fn is_recognized(self) -> bool {
        Self::RECOGNIZED.contains(&self)
    }

    /// Canonical transfer function of this colorspace.
    pub fn default_transfer_function(self) -> TransferFunction {
        match self {
            Self::OpRgb => TransferFunction::OpRgb,
            Self::Smpte240m => TransferFunction::Smpte240m,
            Self::DciP3 => TransferFunction::DciP3,
            Self::Raw => TransferFunction::Linear,
            Self::Srgb | Self::Jpeg => TransferFunction::Srgb,
            _ => TransferFunction::Rec709,
        }
    }

    /// Canonical Y'CbCr encoding of this colorspace.
    ///
    /// Rec. 709 maps to the 709 matrix, not 601.
    pub fn default_ycbcr_encoding(self) -> YCbCrEncoding {
        match self {
            Self::Rec709 | Self::DciP3 => YCbCrEncoding::Rec709,
            Self::Bt2020 => YCbCrEncoding::Bt2020,
            Self::Smpte240m => YCbCrEncoding::Smpte240m,
            _ => YCbCrEncoding::Bt601,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unspecified => "default",
            Self::Smpte170m => "smpte170m",
            Self::Smpte240m => "smpte240m",
            Self::Rec709 => "rec709",
            Self::Bt878 => "bt878",
            Self::System470M => "470m",
            Self::System470Bg => "470bg",
            Self::Jpeg => "jpeg",
            Self::Srgb => "srgb",
            Self::OpRgb => "oprgb",
            Self::Bt2020 => "bt2020",
            Self::Raw => "raw",
            Self::DciP3 => "dcip3",
        }
    }
}

impl fmt::Display for Colorspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colorspace {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        (0..=12)
            .map(Self::from_raw)
            .find(|c| c.name() == lower)
            .ok_or_else(|| ColorParseError::new("colorspace", s))
    }
}

// ── Transfer function ────────────────────────────────────────────────

/// Transfer function (the non-linear encoding curve).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferFunction {
    #[default]
    Unspecified,
    Rec709,
    Srgb,
    OpRgb,
    Smpte240m,
    /// Samples are linear light.
    Linear,
    DciP3,
    Smpte2084,
}

impl TransferFunction {
    pub const ALL: [TransferFunction; 7] = [
        Self::Rec709,
        Self::Srgb,
        Self::OpRgb,
        Self::DciP3,
        Self::Smpte2084,
        Self::Smpte240m,
        Self::Linear,
    ];

    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Rec709,
            2 => Self::Srgb,
            3 => Self::OpRgb,
            4 => Self::Smpte240m,
            5 => Self::Linear,
            6 => Self::DciP3,
            7 => Self::Smpte2084,
            _ => Self::Unspecified,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Rec709 => 1,
            Self::Srgb => 2,
            Self::OpRgb => 3,
            Self::Smpte240m => 4,
            Self::Linear => 5,
            Self::DciP3 => 6,
            Self::Smpte2084 => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unspecified => "default",
            Self::Rec709 => "rec709",
            Self::Srgb => "srgb",
            Self::OpRgb => "oprgb",
            Self::Smpte240m => "smpte240m",
            Self::Linear => "none",
            Self::DciP3 => "dcip3",
            Self::Smpte2084 => "smpte2084",
        }
    }
}

impl fmt::Display for TransferFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransferFunction {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "709" {
            return Ok(Self::Rec709);
        }
        (0..=7)
            .map(Self::from_raw)
            .find(|t| t.name() == lower)
            .ok_or_else(|| ColorParseError::new("transfer function", s))
    }
}

// ── Matrix encodings ─────────────────────────────────────────────────

/// Y'CbCr matrix encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YCbCrEncoding {
    Bt601,
    Rec709,
    Xv601,
    Xv709,
    Bt2020,
    Bt2020ConstLum,
    Smpte240m,
}

impl YCbCrEncoding {
    pub const ALL: [YCbCrEncoding; 7] = [
        Self::Bt601,
        Self::Rec709,
        Self::Xv601,
        Self::Xv709,
        Self::Bt2020,
        Self::Bt2020ConstLum,
        Self::Smpte240m,
    ];

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Bt601),
            2 => Some(Self::Rec709),
            3 => Some(Self::Xv601),
            4 => Some(Self::Xv709),
            6 => Some(Self::Bt2020),
            7 => Some(Self::Bt2020ConstLum),
            8 => Some(Self::Smpte240m),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Bt601 => 1,
            Self::Rec709 => 2,
            Self::Xv601 => 3,
            Self::Xv709 => 4,
            Self::Bt2020 => 6,
            Self::Bt2020ConstLum => 7,
            Self::Smpte240m => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bt601 => "601",
            Self::Rec709 => "709",
            Self::Xv601 => "xv601",
            Self::Xv709 => "xv709",
            Self::Bt2020 => "bt2020",
            Self::Bt2020ConstLum => "bt2020c",
            Self::Smpte240m => "smpte240m",
        }
    }
}

/// HSV hue encoding: hue spans 0..180 or 0..256.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HsvEncoding {
    Hue180,
    Hue256,
}

impl HsvEncoding {
    pub const ALL: [HsvEncoding; 2] = [Self::Hue180, Self::Hue256];

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            128 => Some(Self::Hue180),
            129 => Some(Self::Hue256),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Hue180 => 128,
            Self::Hue256 => 129,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Hue180 => "180",
            Self::Hue256 => "256",
        }
    }
}

/// How samples map to R'G'B'. Which flavor applies depends on the format family.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixEncoding {
    #[default]
    Unspecified,
    YCbCr(YCbCrEncoding),
    Hsv(HsvEncoding),
    /// RGB, Bayer and grey samples: no matrix.
    Identity,
}

impl MatrixEncoding {
    /// Decode the shared encoding field of a device format.
    pub fn from_raw(raw: u32) -> Self {
        if let Some(hsv) = HsvEncoding::from_raw(raw) {
            return Self::Hsv(hsv);
        }
        YCbCrEncoding::from_raw(raw).map_or(Self::Unspecified, Self::YCbCr)
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Unspecified | Self::Identity => 0,
            Self::YCbCr(e) => e.as_raw(),
            Self::Hsv(e) => e.as_raw(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unspecified => "default",
            Self::YCbCr(e) => e.name(),
            Self::Hsv(e) => e.name(),
            Self::Identity => "identity",
        }
    }
}

impl fmt::Display for MatrixEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatrixEncoding {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "default" {
            return Ok(Self::Unspecified);
        }
        if let Some(e) = YCbCrEncoding::ALL.into_iter().find(|e| e.name() == lower) {
            return Ok(Self::YCbCr(e));
        }
        if let Some(e) = HsvEncoding::ALL.into_iter().find(|e| e.name() == lower) {
            return Ok(Self::Hsv(e));
        }
        Err(ColorParseError::new("matrix encoding", s))
    }
}

// ── Quantization ─────────────────────────────────────────────────────

/// Quantization range of the samples.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantization {
    #[default]
    Unspecified,
    FullRange,
    LimitedRange,
}

impl Quantization {
    pub const ALL: [Quantization; 2] = [Self::FullRange, Self::LimitedRange];

    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::FullRange,
            2 => Self::LimitedRange,
            _ => Self::Unspecified,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::FullRange => 1,
            Self::LimitedRange => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unspecified => "default",
            Self::FullRange => "full-range",
            Self::LimitedRange => "lim-range",
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quantization {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Unspecified),
            "full" | "full-range" => Ok(Self::FullRange),
            "limited" | "lim-range" | "limited-range" => Ok(Self::LimitedRange),
            _ => Err(ColorParseError::new("quantization", s)),
        }
    }
}

// ── Attribute sets ───────────────────────────────────────────────────

/// Color interpretation of a frame, either as reported or as resolved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorAttributes {
    pub colorspace: Colorspace,
    pub transfer_function: TransferFunction,
    pub matrix_encoding: MatrixEncoding,
    pub quantization: Quantization,
}

impl ColorAttributes {
    /// True when no field holds the `Unspecified` sentinel.
    pub fn is_fully_specified(&self) -> bool {
        self.colorspace != Colorspace::Unspecified
            && self.transfer_function != TransferFunction::Unspecified
            && self.matrix_encoding != MatrixEncoding::Unspecified
            && self.quantization != Quantization::Unspecified
    }

    /// GPU sRGB decode is only correct for full-range sRGB-encoded samples.
    pub fn allows_srgb_decode(&self) -> bool {
        self.quantization == Quantization::FullRange
            && self.transfer_function == TransferFunction::Srgb
    }
}

impl fmt::Display for ColorAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "colorspace={} xfer={} enc={} quant={}",
            self.colorspace, self.transfer_function, self.matrix_encoding, self.quantization
        )
    }
}

/// User-requested attribute values. `Unspecified` means "no override".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideSet {
    pub colorspace: Colorspace,
    pub transfer_function: TransferFunction,
    pub matrix_encoding: MatrixEncoding,
    pub quantization: Quantization,
}

impl OverrideSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<ColorAttributes> for OverrideSet {
    fn from(color: ColorAttributes) -> Self {
        Self {
            colorspace: color.colorspace,
            transfer_function: color.transfer_function,
            matrix_encoding: color.matrix_encoding,
            quantization: color.quantization,
        }
    }
}

//! `vc-common` — Pixel formats, color attributes and errors shared by the capture viewer.
//!
//! This crate has no I/O. It defines:
//!
//! - **Formats**: `FourCc`, `PixelFormat`, `FormatDescriptor` and the classifier
//! - **Color**: colorspace / transfer / matrix / quantization enums, `ColorAttributes`, `OverrideSet`
//! - **Resolver**: `resolve`, `ResolvedFormat`
//! - **GPU gate**: `GpuCapabilities`, `StaticCapabilities`
//! - **Errors**: `SessionError`, `FormatError`, `DeviceError`, etc. (thiserror-based)
//! - **Config**: `ViewerConfig`, `ProfilePreference`

pub mod color;
pub mod config;
pub mod error;
pub mod format;
pub mod fourcc;
pub mod gpu;
pub mod resolve;

// Re-export commonly used items at crate root
pub use color::{
    ColorAttributes, Colorspace, HsvEncoding, MatrixEncoding, OverrideSet, Quantization,
    TransferFunction, YCbCrEncoding,
};
pub use config::{ProfilePreference, ViewerConfig, MIN_BUFFER_COUNT};
pub use error::{
    ColorParseError, ConfigError, DeviceError, FormatError, RenderError, SessionError,
    SessionResult,
};
pub use format::{
    classify, supported_formats, ChromaSubsampling, FormatDescriptor, FormatFamily, PixelFormat,
};
pub use fourcc::FourCc;
pub use gpu::{GpuCapabilities, StaticCapabilities};
pub use resolve::{resolve, ResolvedFormat};

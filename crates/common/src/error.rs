//! Central error types for the viewer (thiserror-based).

use thiserror::Error;

use crate::fourcc::FourCc;

/// Top-level session error.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The format negotiated at open time cannot be displayed.
    #[error("Format rejected: {0}")]
    FormatRejected(FormatError),

    /// A source change produced a format that cannot be displayed.
    #[error("Renegotiation failed: {0}")]
    Renegotiation(FormatError),

    #[error("Session is closed")]
    Closed,
}

/// Pixel format classification and capability gate errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported pixel format {fourcc}")]
    Unsupported { fourcc: FourCc },

    #[error("Pixel format {fourcc} needs GPU byte-swap support")]
    NeedsByteSwap { fourcc: FourCc },

    #[error("Pixel format {fourcc} needs a desktop GPU profile")]
    NeedsDesktopProfile { fourcc: FourCc },
}

/// Capture device errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Dequeue failed: {0}")]
    Dequeue(String),

    #[error("Enqueue of buffer {index} failed: {reason}")]
    Enqueue { index: u32, reason: String },

    #[error("Event read failed: {0}")]
    Event(String),

    #[error("Format query failed: {0}")]
    Query(String),

    #[error("Device closed")]
    Closed,
}

/// Render backend errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Program build failed for {variant}: {log}")]
    ProgramBuild { variant: String, log: String },

    #[error("Texture upload failed: {reason}")]
    Upload { reason: String },

    #[error("Draw failed: {reason}")]
    Draw { reason: String },

    #[error("Renderer has no active program")]
    NotConfigured,
}

/// Viewer configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Buffer count {requested} is below the minimum of {minimum}")]
    TooFewBuffers { requested: u32, minimum: u32 },
}

/// A color attribute name that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct ColorParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ColorParseError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Convenience Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

//! GPU capability queries consumed by the format gate.
//!
//! Capabilities are read from the live GPU context when it comes up and are
//! re-read whenever that context is recreated.

use serde::{Deserialize, Serialize};

/// What the running GPU context can do.
pub trait GpuCapabilities {
    /// True for embedded/ES-class contexts.
    fn is_constrained_profile(&self) -> bool;

    /// True when 16-bit texel byte-swapping is available on upload.
    fn supports_byte_swap(&self) -> bool;
}

/// A fixed capability snapshot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCapabilities {
    pub constrained_profile: bool,
    pub byte_swap: bool,
}

impl StaticCapabilities {
    /// Full desktop context with every extension.
    pub const DESKTOP: Self = Self {
        constrained_profile: false,
        byte_swap: true,
    };

    /// Embedded context without byte-swap support.
    pub const EMBEDDED: Self = Self {
        constrained_profile: true,
        byte_swap: false,
    };

    /// Take a snapshot of any capability source.
    pub fn snapshot(caps: &dyn GpuCapabilities) -> Self {
        Self {
            constrained_profile: caps.is_constrained_profile(),
            byte_swap: caps.supports_byte_swap(),
        }
    }
}

impl GpuCapabilities for StaticCapabilities {
    fn is_constrained_profile(&self) -> bool {
        self.constrained_profile
    }

    fn supports_byte_swap(&self) -> bool {
        self.byte_swap
    }
}

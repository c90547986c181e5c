//! Viewer configuration.

use serde::{Deserialize, Serialize};

use crate::color::OverrideSet;
use crate::error::ConfigError;
use crate::gpu::{GpuCapabilities, StaticCapabilities};

/// Two buffers held by the viewer plus one the device can fill.
pub const MIN_BUFFER_COUNT: u32 = 3;

/// GPU profile preference.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfilePreference {
    /// Use whatever the GPU context reports.
    #[default]
    Auto,
    /// Treat the context as a full desktop profile.
    ForceDesktop,
    /// Treat the context as an embedded profile.
    ForceEmbedded,
}

impl ProfilePreference {
    /// Apply the preference to the capabilities reported by the context.
    pub fn apply(self, caps: &dyn GpuCapabilities) -> StaticCapabilities {
        let mut snapshot = StaticCapabilities::snapshot(caps);
        match self {
            Self::Auto => {}
            Self::ForceDesktop => snapshot.constrained_profile = false,
            Self::ForceEmbedded => snapshot.constrained_profile = true,
        }
        snapshot
    }
}

/// Top-level viewer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Number of device buffers to request.
    pub buffer_count: u32,
    /// Log the negotiated format and resolved colors on every negotiation.
    pub verbose: bool,
    /// Log render tick durations.
    pub report_timings: bool,
    pub profile: ProfilePreference,
    /// Overrides in effect when the session opens.
    pub overrides: OverrideSet,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            buffer_count: 4,
            verbose: false,
            report_timings: false,
            profile: ProfilePreference::Auto,
            overrides: OverrideSet::default(),
        }
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_count < MIN_BUFFER_COUNT {
            return Err(ConfigError::TooFewBuffers {
                requested: self.buffer_count,
                minimum: MIN_BUFFER_COUNT,
            });
        }
        Ok(())
    }
}

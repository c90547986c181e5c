//! `vc-capture` — Device buffer queue contract and the two-slot frame pipeline.
//!
//! - **Frames**: `FrameSlot` (non-owning view of a dequeued device buffer)
//! - **Device**: `DeviceQueue` trait, `DeviceFormat`, `DeviceEvent`
//! - **Pipeline**: `FramePipeline` (pending / displayed hand-off, buffer recycling)
//! - **Synthetic**: `SyntheticDevice` test-pattern device with a custody probe

pub mod device;
pub mod frame;
pub mod pipeline;
pub mod synthetic;

pub use device::{DeviceEvent, DeviceFormat, DeviceQueue, PlaneLayout};
pub use frame::{FrameSlot, MAX_PLANES};
pub use pipeline::{FramePipeline, PipelineStats, TickFrame};
pub use synthetic::{pattern_byte, SyntheticDevice, SyntheticProbe};

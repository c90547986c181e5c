//! `vc-render` — Render variant selection and the GPU program state machine.
//!
//! - **Variants**: `RenderVariant`, `ProgramSpec`, per-family texture plans
//! - **Backend**: `RenderBackend` trait, `ProgramId`
//! - **Dispatch**: `RenderDispatch` (reselects the program on spec changes)
//! - **Headless**: `HeadlessBackend` that records calls

pub mod backend;
pub mod dispatch;
pub mod headless;
pub mod variant;

pub use backend::{ProgramId, RenderBackend};
pub use dispatch::RenderDispatch;
pub use headless::{HeadlessBackend, UploadRecord};
pub use variant::{plan_textures, ProgramSpec, RenderVariant, TextureRole, TextureSpec};

//! GPU render backend abstraction.
//!
//! The dispatch state machine programs against this trait. A backend turns a
//! [`ProgramSpec`] into a compiled program, uploads plane bytes into the
//! program's textures and draws the quad.

use serde::{Deserialize, Serialize};

use vc_common::RenderError;

use crate::variant::{ProgramSpec, TextureSpec};

/// Handle to a compiled program.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub u64);

/// GPU operations needed to show a frame.
pub trait RenderBackend {
    /// Compile and link the program for `spec`, allocating its textures.
    fn build_program(&mut self, spec: &ProgramSpec) -> Result<ProgramId, RenderError>;

    /// Release a program and its textures.
    fn destroy_program(&mut self, program: ProgramId);

    /// Copy `data` into one texture. The bytes are consumed before returning.
    fn upload(
        &mut self,
        program: ProgramId,
        texture: &TextureSpec,
        data: &[u8],
    ) -> Result<(), RenderError>;

    /// Draw with the textures as last uploaded.
    fn draw(&mut self, program: ProgramId) -> Result<(), RenderError>;
}

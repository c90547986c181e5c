//! Headless render backend.
//!
//! Records calls instead of touching a GPU. Used for tests and for
//! running a session without a display surface. Each log keeps only the
//! newest [`RECORD_LIMIT`] entries; the totals keep counting.

use tracing::trace;

use vc_common::RenderError;

use crate::backend::{ProgramId, RenderBackend};
use crate::variant::{ProgramSpec, TextureRole, TextureSpec};

/// Entries kept per log.
pub const RECORD_LIMIT: usize = 1024;

/// One recorded texture upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRecord {
    pub program: ProgramId,
    pub role: TextureRole,
    pub len: usize,
    /// First byte of the uploaded data, if any.
    pub first_byte: Option<u8>,
}

/// Backend that keeps a log instead of rendering.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    built: Vec<(ProgramId, ProgramSpec)>,
    destroyed: Vec<ProgramId>,
    uploads: Vec<UploadRecord>,
    draws: Vec<ProgramId>,
    live: usize,
    upload_count: u64,
    draw_count: u64,
    fail_builds: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent program build fail.
    pub fn fail_builds(&mut self, fail: bool) {
        self.fail_builds = fail;
    }

    pub fn built(&self) -> &[(ProgramId, ProgramSpec)] {
        &self.built
    }

    pub fn destroyed(&self) -> &[ProgramId] {
        &self.destroyed
    }

    pub fn uploads(&self) -> &[UploadRecord] {
        &self.uploads
    }

    pub fn draws(&self) -> &[ProgramId] {
        &self.draws
    }

    /// Programs built and not yet destroyed.
    pub fn live_programs(&self) -> usize {
        self.live
    }

    /// Uploads since creation, including ones dropped from the log.
    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }

    /// Draws since creation, including ones dropped from the log.
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }
}

impl RenderBackend for HeadlessBackend {
    fn build_program(&mut self, spec: &ProgramSpec) -> Result<ProgramId, RenderError> {
        if self.fail_builds {
            return Err(RenderError::ProgramBuild {
                variant: spec.variant.to_string(),
                log: "headless build failure".into(),
            });
        }
        self.next_id += 1;
        let id = ProgramId(self.next_id);
        trace!(program = id.0, variant = %spec.variant, "Headless program built");
        record(&mut self.built, (id, spec.clone()));
        self.live += 1;
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        record(&mut self.destroyed, program);
        self.live = self.live.saturating_sub(1);
    }

    fn upload(
        &mut self,
        program: ProgramId,
        texture: &TextureSpec,
        data: &[u8],
    ) -> Result<(), RenderError> {
        if data.len() < texture.byte_len() {
            return Err(RenderError::Upload {
                reason: format!(
                    "{:?} texture needs {} bytes, got {}",
                    texture.role,
                    texture.byte_len(),
                    data.len()
                ),
            });
        }
        record(
            &mut self.uploads,
            UploadRecord {
                program,
                role: texture.role,
                len: data.len(),
                first_byte: data.first().copied(),
            },
        );
        self.upload_count += 1;
        Ok(())
    }

    fn draw(&mut self, program: ProgramId) -> Result<(), RenderError> {
        record(&mut self.draws, program);
        self.draw_count += 1;
        Ok(())
    }
}

// ── internal helpers ──────────────────────────────────────────────

/// Append, dropping the oldest half once the log is full.
fn record<T>(log: &mut Vec<T>, entry: T) {
    if log.len() >= RECORD_LIMIT {
        log.drain(..RECORD_LIMIT / 2);
    }
    log.push(entry);
}

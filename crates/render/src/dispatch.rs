//! Render Dispatch — the variant state machine.
//!
//! The dispatcher is either idle or has exactly one active program. Any
//! change to the program spec (format, geometry, or resolved color) tears the
//! active program down and builds the new one; frame content never does.

use tracing::{debug, error, info};

use vc_capture::{DeviceFormat, FrameSlot};
use vc_common::{RenderError, ResolvedFormat};

use crate::backend::{ProgramId, RenderBackend};
use crate::variant::{ProgramSpec, RenderVariant};

enum DispatchState {
    Idle,
    Active { program: ProgramId, spec: ProgramSpec },
}

/// Owns the render backend and the active program.
pub struct RenderDispatch<B: RenderBackend> {
    backend: B,
    state: DispatchState,
    transitions: u64,
}

impl<B: RenderBackend> RenderDispatch<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: DispatchState::Idle,
            transitions: 0,
        }
    }

    /// Bring the active program in line with `resolved` and `format`.
    ///
    /// Returns `Ok(true)` when a new program was built, `Ok(false)` when the
    /// active one already matches. On a build failure the dispatcher is left
    /// idle.
    pub fn reconfigure(
        &mut self,
        resolved: &ResolvedFormat,
        format: &DeviceFormat,
    ) -> Result<bool, RenderError> {
        let spec = ProgramSpec::new(&resolved.descriptor, &resolved.color, format);
        if let DispatchState::Active { spec: active, .. } = &self.state {
            if *active == spec {
                return Ok(false);
            }
        }

        self.teardown();
        let program = match self.backend.build_program(&spec) {
            Ok(program) => program,
            Err(e) => {
                error!(variant = %spec.variant, error = %e, "Program build failed");
                return Err(e);
            }
        };
        info!(
            variant = %spec.variant,
            fourcc = %spec.fourcc,
            width = spec.width,
            height = spec.height,
            textures = spec.textures.len(),
            "Render variant selected"
        );
        self.transitions += 1;
        self.state = DispatchState::Active { program, spec };
        Ok(true)
    }

    /// Upload every texture of the active program from `slot`.
    pub fn upload_frame(&mut self, slot: &FrameSlot) -> Result<(), RenderError> {
        let DispatchState::Active { program, spec } = &self.state else {
            return Err(RenderError::NotConfigured);
        };
        for texture in &spec.textures {
            let plane = slot.plane(texture.plane).ok_or_else(|| RenderError::Upload {
                reason: format!("buffer {} has no plane {}", slot.index(), texture.plane),
            })?;
            let end = texture.offset + texture.byte_len();
            let data = plane.get(texture.offset..end).ok_or_else(|| RenderError::Upload {
                reason: format!(
                    "plane {} holds {} bytes, {:?} texture needs {}..{}",
                    texture.plane,
                    plane.len(),
                    texture.role,
                    texture.offset,
                    end
                ),
            })?;
            self.backend.upload(*program, texture, data)?;
        }
        Ok(())
    }

    /// Draw the active program.
    pub fn draw(&mut self) -> Result<(), RenderError> {
        match &self.state {
            DispatchState::Active { program, .. } => self.backend.draw(*program),
            DispatchState::Idle => Err(RenderError::NotConfigured),
        }
    }

    /// Destroy the active program, if any.
    pub fn teardown(&mut self) {
        if let DispatchState::Active { program, spec } =
            std::mem::replace(&mut self.state, DispatchState::Idle)
        {
            debug!(program = program.0, variant = %spec.variant, "Tearing down program");
            self.backend.destroy_program(program);
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DispatchState::Active { .. })
    }

    pub fn variant(&self) -> Option<RenderVariant> {
        self.spec().map(|s| s.variant)
    }

    pub fn spec(&self) -> Option<&ProgramSpec> {
        match &self.state {
            DispatchState::Active { spec, .. } => Some(spec),
            DispatchState::Idle => None,
        }
    }

    /// Number of programs built so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend> std::fmt::Debug for RenderDispatch<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDispatch")
            .field("variant", &self.variant())
            .field("transitions", &self.transitions)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use crate::variant::TextureRole;
    use vc_capture::{DeviceQueue, SyntheticDevice};
    use vc_common::{
        ColorAttributes, Colorspace, OverrideSet, PixelFormat, Quantization,
    };

    fn setup(format: PixelFormat) -> (ResolvedFormat, DeviceFormat) {
        let dev = DeviceFormat::new(format, 32, 16, ColorAttributes::default());
        let resolved = ResolvedFormat::new(
            &format.descriptor(),
            &dev.color,
            &OverrideSet::default(),
        );
        (resolved, dev)
    }

    // ── Transitions ──────────────────────────────────────────────

    #[test]
    fn first_reconfigure_builds() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let (resolved, dev) = setup(PixelFormat::Nv12);
        assert!(d.reconfigure(&resolved, &dev).unwrap());
        assert!(d.is_active());
        assert_eq!(d.transitions(), 1);
        assert_eq!(d.backend().live_programs(), 1);
    }

    #[test]
    fn same_spec_keeps_program() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let (resolved, dev) = setup(PixelFormat::Nv12);
        d.reconfigure(&resolved, &dev).unwrap();
        assert!(!d.reconfigure(&resolved, &dev).unwrap());
        assert_eq!(d.backend().built().len(), 1);
    }

    #[test]
    fn color_change_rebuilds() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let (resolved, dev) = setup(PixelFormat::Nv12);
        d.reconfigure(&resolved, &dev).unwrap();

        let overrides = OverrideSet {
            quantization: Quantization::FullRange,
            ..OverrideSet::default()
        };
        let full = ResolvedFormat::new(&PixelFormat::Nv12.descriptor(), &dev.color, &overrides);
        assert!(d.reconfigure(&full, &dev).unwrap());
        assert_eq!(d.backend().destroyed().len(), 1);
        assert_eq!(d.backend().live_programs(), 1);
    }

    #[test]
    fn format_change_switches_variant() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let (resolved, dev) = setup(PixelFormat::Yuyv);
        d.reconfigure(&resolved, &dev).unwrap();
        assert_eq!(d.variant(), Some(RenderVariant::PackedYuv));

        let (resolved, dev) = setup(PixelFormat::Bgr24);
        d.reconfigure(&resolved, &dev).unwrap();
        assert_eq!(d.variant(), Some(RenderVariant::Rgb));
        assert_eq!(d.spec().map(|s| s.color.colorspace), Some(Colorspace::Srgb));
    }

    #[test]
    fn build_failure_leaves_idle() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let (resolved, dev) = setup(PixelFormat::Nv12);
        d.reconfigure(&resolved, &dev).unwrap();

        d.backend_mut().fail_builds(true);
        let (resolved, dev) = setup(PixelFormat::Grey);
        let err = d.reconfigure(&resolved, &dev).unwrap_err();
        assert!(matches!(err, RenderError::ProgramBuild { .. }));
        assert!(!d.is_active());
        assert_eq!(d.backend().live_programs(), 0);
        assert_eq!(d.draw(), Err(RenderError::NotConfigured));
    }

    // ── Upload and draw ──────────────────────────────────────────

    #[test]
    fn uploads_every_texture() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let (resolved, dev) = setup(PixelFormat::Yuv420);
        d.reconfigure(&resolved, &dev).unwrap();

        let mut device = SyntheticDevice::new(dev, 3);
        device.capture();
        let slot = device.dequeue_ready().unwrap().unwrap();
        d.upload_frame(&slot).unwrap();
        d.draw().unwrap();
        device.enqueue(slot).unwrap();

        let roles: Vec<_> = d.backend().uploads().iter().map(|u| u.role).collect();
        assert_eq!(roles, vec![TextureRole::Luma, TextureRole::Cb, TextureRole::Cr]);
        assert_eq!(d.backend().uploads()[1].len, 16 * 8);
        assert_eq!(d.backend().draws().len(), 1);
    }

    #[test]
    fn short_plane_is_an_upload_error() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let (resolved, dev) = setup(PixelFormat::Rgb24);
        d.reconfigure(&resolved, &dev).unwrap();

        let data = [0u8; 10];
        let slot = unsafe { FrameSlot::from_raw_parts(0, &[(data.as_ptr(), data.len())]) };
        assert!(matches!(
            d.upload_frame(&slot),
            Err(RenderError::Upload { .. })
        ));
    }

    #[test]
    fn upload_without_program() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let data = [0u8; 4];
        let slot = unsafe { FrameSlot::from_raw_parts(0, &[(data.as_ptr(), 4)]) };
        assert_eq!(d.upload_frame(&slot), Err(RenderError::NotConfigured));
    }

    #[test]
    fn teardown_destroys_program() {
        let mut d = RenderDispatch::new(HeadlessBackend::new());
        let (resolved, dev) = setup(PixelFormat::Hsv24);
        d.reconfigure(&resolved, &dev).unwrap();
        d.teardown();
        d.teardown();
        assert!(!d.is_active());
        assert_eq!(d.backend().destroyed().len(), 1);
    }
}

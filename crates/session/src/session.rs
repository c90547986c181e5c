//! Capture session — format negotiation, color overrides and frame display.
//!
//! A [`CaptureSession`] ties one capture device to one render backend:
//!
//! 1. **Negotiate**: classify the device format, check it against the GPU
//!    capabilities, resolve its colors and select the render variant.
//! 2. **Ingest**: dequeued buffers flow through the two-slot pipeline.
//! 3. **Render**: each tick uploads a freshly promoted frame and draws.
//!
//! Format rejection, renegotiation failure, enqueue failure and program
//! build failure are fatal and come back as `Err`. A format that stops
//! being displayable after a source or capability change also closes the
//! session, so later calls return [`SessionError::Closed`]. Dequeue and
//! upload failures are logged, counted and skipped.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use vc_capture::{DeviceEvent, DeviceFormat, DeviceQueue, FramePipeline, PipelineStats, TickFrame};
use vc_common::{
    classify, ColorAttributes, Colorspace, FormatDescriptor, FormatError, GpuCapabilities,
    MatrixEncoding, OverrideSet, Quantization, RenderError, ResolvedFormat, SessionError,
    SessionResult, StaticCapabilities, TransferFunction, ViewerConfig,
};
use vc_render::{RenderBackend, RenderDispatch, RenderVariant};

/// Session-level counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub pipeline: PipelineStats,
    /// GPU programs built (variant transitions).
    pub program_builds: u64,
    /// Frames skipped because their upload failed.
    pub upload_failures: u64,
    /// Successful format negotiations, including the first.
    pub negotiations: u64,
    /// Cumulative time spent in render ticks.
    pub render_time: Duration,
    pub slowest_tick: Duration,
}

/// Result of one render tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new frame was uploaded and drawn.
    Uploaded,
    /// The previous frame was drawn again.
    Redrawn,
    /// No frame has arrived yet.
    Empty,
    /// The new frame could not be uploaded; nothing was drawn.
    Skipped,
}

struct Negotiated {
    format: DeviceFormat,
    base: FormatDescriptor,
    resolved: ResolvedFormat,
}

/// One capture device shown on one render backend.
pub struct CaptureSession<D: DeviceQueue, B: RenderBackend> {
    config: ViewerConfig,
    pipeline: FramePipeline<D>,
    renderer: RenderDispatch<B>,
    caps: StaticCapabilities,
    overrides: OverrideSet,
    current: Option<Negotiated>,
    /// Set once the first format report has been logged.
    announced: bool,
    closed: bool,
    upload_failures: u64,
    negotiations: u64,
    render_time: Duration,
    slowest_tick: Duration,
}

impl<D: DeviceQueue, B: RenderBackend> CaptureSession<D, B> {
    /// Validate the configuration, subscribe to source changes and negotiate
    /// the device's current format.
    pub fn open(
        config: ViewerConfig,
        mut device: D,
        backend: B,
        caps: &dyn GpuCapabilities,
    ) -> SessionResult<Self> {
        config.validate()?;
        if device.buffer_count() < config.buffer_count {
            warn!(
                requested = config.buffer_count,
                allocated = device.buffer_count(),
                "Device allocated fewer buffers than requested"
            );
        }
        device.subscribe_source_change()?;

        let mut session = Self {
            caps: config.profile.apply(caps),
            overrides: config.overrides,
            config,
            pipeline: FramePipeline::new(device),
            renderer: RenderDispatch::new(backend),
            current: None,
            announced: false,
            closed: false,
            upload_failures: 0,
            negotiations: 0,
            render_time: Duration::ZERO,
            slowest_tick: Duration::ZERO,
        };
        session.negotiate(SessionError::FormatRejected)?;
        Ok(session)
    }

    // ── Device events ────────────────────────────────────────────

    /// Take every ready buffer from the device.
    pub fn handle_device_ready(&mut self) -> SessionResult<usize> {
        self.ensure_open()?;
        Ok(self.pipeline.poll_device()?)
    }

    /// Process pending device events. Returns `true` if the format was renegotiated.
    pub fn handle_device_events(&mut self) -> SessionResult<bool> {
        self.ensure_open()?;
        let mut renegotiated = false;
        while let Some(event) = self.pipeline.device_mut().poll_event()? {
            match event {
                DeviceEvent::SourceChange => {
                    info!("Source change, renegotiating format");
                    self.pipeline.invalidate()?;
                    self.renderer.teardown();
                    self.current = None;
                    if !self.overrides.is_empty() {
                        debug!("Clearing color overrides for the new source");
                        self.overrides = OverrideSet::default();
                    }
                    if let Err(e) = self.negotiate(SessionError::Renegotiation) {
                        return Err(self.fail(e));
                    }
                    renegotiated = true;
                }
            }
        }
        Ok(renegotiated)
    }

    // ── Rendering ────────────────────────────────────────────────

    /// Promote the newest frame and draw.
    pub fn render_tick(&mut self) -> SessionResult<TickOutcome> {
        self.ensure_open()?;
        let start = Instant::now();

        let outcome = match self.pipeline.on_render_tick()? {
            TickFrame::Empty => TickOutcome::Empty,
            TickFrame::Stale(_) => {
                self.renderer.draw()?;
                TickOutcome::Redrawn
            }
            TickFrame::Fresh(slot) => match self.renderer.upload_frame(slot) {
                Ok(()) => {
                    self.renderer.draw()?;
                    TickOutcome::Uploaded
                }
                Err(e @ RenderError::Upload { .. }) => {
                    self.upload_failures += 1;
                    warn!(index = slot.index(), error = %e, "Frame upload failed, skipping");
                    TickOutcome::Skipped
                }
                Err(e) => return Err(e.into()),
            },
        };

        let elapsed = start.elapsed();
        self.render_time += elapsed;
        self.slowest_tick = self.slowest_tick.max(elapsed);
        if self.config.report_timings {
            debug!(
                elapsed_us = elapsed.as_micros() as u64,
                outcome = ?outcome,
                "Render tick"
            );
        }
        Ok(outcome)
    }

    // ── Overrides ────────────────────────────────────────────────

    pub fn set_colorspace(&mut self, colorspace: Colorspace) -> SessionResult<()> {
        self.update_overrides(|o| o.colorspace = colorspace)
    }

    pub fn set_transfer_function(&mut self, transfer: TransferFunction) -> SessionResult<()> {
        self.update_overrides(|o| o.transfer_function = transfer)
    }

    /// Has no effect on HSV formats, whose hue range always comes from the device.
    pub fn set_matrix_encoding(&mut self, encoding: MatrixEncoding) -> SessionResult<()> {
        self.update_overrides(|o| o.matrix_encoding = encoding)
    }

    pub fn set_quantization(&mut self, quantization: Quantization) -> SessionResult<()> {
        self.update_overrides(|o| o.quantization = quantization)
    }

    /// Replace every override at once.
    pub fn set_overrides(&mut self, overrides: OverrideSet) -> SessionResult<()> {
        self.update_overrides(|o| *o = overrides)
    }

    /// Drop all overrides so the device-reported values apply again.
    pub fn restore_all(&mut self) -> SessionResult<()> {
        self.set_overrides(OverrideSet::default())
    }

    /// Re-gate and re-select after the GPU context or its capabilities changed.
    pub fn capabilities_changed(&mut self, caps: &dyn GpuCapabilities) -> SessionResult<()> {
        self.ensure_open()?;
        self.caps = self.config.profile.apply(caps);
        self.renderer.teardown();
        if let Some(current) = &self.current {
            if let Err(e) = current.base.check_gate(&self.caps) {
                return Err(self.fail(SessionError::FormatRejected(e)));
            }
        }
        self.reapply()
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Resolved color attributes of the current format.
    pub fn resolved_color(&self) -> Option<ColorAttributes> {
        self.current.as_ref().map(|c| c.resolved.color)
    }

    /// Color attributes as the device reported them.
    pub fn reported_color(&self) -> Option<ColorAttributes> {
        self.current.as_ref().map(|c| c.format.color)
    }

    /// Effective descriptor of the current format.
    pub fn descriptor(&self) -> Option<FormatDescriptor> {
        self.current.as_ref().map(|c| c.resolved.descriptor)
    }

    pub fn device_format(&self) -> Option<&DeviceFormat> {
        self.current.as_ref().map(|c| &c.format)
    }

    pub fn overrides(&self) -> OverrideSet {
        self.overrides
    }

    pub fn variant(&self) -> Option<RenderVariant> {
        self.renderer.variant()
    }

    pub fn capabilities(&self) -> StaticCapabilities {
        self.caps
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            pipeline: self.pipeline.stats().clone(),
            program_builds: self.renderer.transitions(),
            upload_failures: self.upload_failures,
            negotiations: self.negotiations,
            render_time: self.render_time,
            slowest_tick: self.slowest_tick,
        }
    }

    /// Buffers held outside the device queue.
    pub fn held_buffers(&self) -> usize {
        self.pipeline.held_count()
    }

    pub fn device(&self) -> &D {
        self.pipeline.device()
    }

    pub fn device_mut(&mut self) -> &mut D {
        self.pipeline.device_mut()
    }

    pub fn renderer(&self) -> &RenderDispatch<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut RenderDispatch<B> {
        &mut self.renderer
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Return held buffers to the device and release the GPU program.
    pub fn close(&mut self) -> SessionResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.renderer.teardown();
        self.pipeline.drain()?;
        info!(stats = ?self.pipeline.stats(), "Session closed");
        Ok(())
    }

    /// Forget held buffers; only for when the device handle is closing too.
    pub fn abandon(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.renderer.teardown();
        self.pipeline.abandon();
        info!("Session abandoned");
    }

    // ── internal helpers ──────────────────────────────────────────

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    /// Stop the session after a fatal error, handing held buffers back.
    fn fail(&mut self, e: SessionError) -> SessionError {
        error!(error = %e, "Session stopped");
        if let Err(drain_err) = self.close() {
            warn!(error = %drain_err, "Drain after fatal error failed");
        }
        e
    }

    fn update_overrides(&mut self, update: impl FnOnce(&mut OverrideSet)) -> SessionResult<()> {
        self.ensure_open()?;
        update(&mut self.overrides);
        self.reapply()
    }

    fn negotiate(&mut self, reject: fn(FormatError) -> SessionError) -> SessionResult<()> {
        let format = self.pipeline.device_mut().current_format()?;
        let base = classify(format.fourcc).ok_or(FormatError::Unsupported {
            fourcc: format.fourcc,
        });
        let base = match base.and_then(|b| b.check_gate(&self.caps).map(|()| b)) {
            Ok(base) => base,
            Err(e) => {
                warn!(fourcc = %format.fourcc, error = %e, "Format not displayable");
                return Err(reject(e));
            }
        };

        let resolved = ResolvedFormat::new(&base, &format.color, &self.overrides);
        self.renderer.reconfigure(&resolved, &format)?;
        self.negotiations += 1;
        self.current = Some(Negotiated {
            format,
            base,
            resolved,
        });
        self.report(true);
        Ok(())
    }

    /// Re-resolve after an override or capability change.
    fn reapply(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        let Some(current) = &mut self.current else {
            return Ok(());
        };
        let resolved = ResolvedFormat::new(&current.base, &current.format.color, &self.overrides);
        let changed = resolved != current.resolved;
        current.resolved = resolved;
        self.renderer.reconfigure(&resolved, &current.format)?;
        if changed {
            self.report(false);
        }
        Ok(())
    }

    fn report(&mut self, negotiated: bool) {
        let Some(current) = &self.current else {
            return;
        };
        let color = current.resolved.color;
        let fourcc = current.format.fourcc;
        let label = if self.announced { "New color setup" } else { "Color setup" };
        info!(
            fourcc = %fourcc,
            colorspace = %color.colorspace,
            xfer = %color.transfer_function,
            enc = %color.matrix_encoding,
            quant = %color.quantization,
            srgb_decode = current.resolved.descriptor.accepts_linear_to_srgb,
            "{label}"
        );
        self.announced = true;

        if negotiated && self.config.verbose {
            let description = current.base.format.description();
            info!(
                width = current.format.width,
                height = current.format.height,
                fourcc = %fourcc,
                format = description,
                "Negotiated format"
            );
            for (i, plane) in current.format.planes.iter().enumerate() {
                info!(
                    plane = i,
                    bytes_per_line = plane.bytes_per_line,
                    size_image = plane.size_image,
                    "Plane layout"
                );
            }
        }
    }
}

impl<D: DeviceQueue, B: RenderBackend> Drop for CaptureSession<D, B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to drain buffers on drop");
        }
    }
}

impl<D: DeviceQueue, B: RenderBackend> std::fmt::Debug for CaptureSession<D, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("fourcc", &self.current.as_ref().map(|c| c.format.fourcc))
            .field("variant", &self.renderer.variant())
            .field("held", &self.pipeline.held_count())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_capture::SyntheticDevice;
    use vc_common::PixelFormat;
    use vc_render::HeadlessBackend;

    fn open(format: PixelFormat) -> CaptureSession<SyntheticDevice, HeadlessBackend> {
        let dev = DeviceFormat::new(format, 16, 8, ColorAttributes::default());
        CaptureSession::open(
            ViewerConfig::default(),
            SyntheticDevice::new(dev, 4),
            HeadlessBackend::new(),
            &StaticCapabilities::DESKTOP,
        )
        .unwrap()
    }

    #[test]
    fn first_report_then_new() {
        let mut s = open(PixelFormat::Nv12);
        assert!(s.announced);
        s.set_quantization(Quantization::FullRange).unwrap();
        assert!(s.announced);
        assert_eq!(s.stats().negotiations, 1);
    }

    #[test]
    fn unchanged_override_keeps_program() {
        let mut s = open(PixelFormat::Nv12);
        s.set_colorspace(Colorspace::Rec709).unwrap();
        assert_eq!(s.stats().program_builds, 1);
    }

    #[test]
    fn closed_session_rejects_work() {
        let mut s = open(PixelFormat::Grey);
        s.close().unwrap();
        s.close().unwrap();
        assert!(matches!(s.render_tick(), Err(SessionError::Closed)));
        assert!(matches!(
            s.set_quantization(Quantization::FullRange),
            Err(SessionError::Closed)
        ));
    }

    #[test]
    fn closed_session_keeps_overrides() {
        let mut s = open(PixelFormat::Nv12);
        s.set_colorspace(Colorspace::Srgb).unwrap();
        let before = s.overrides();
        s.close().unwrap();

        assert!(s.set_quantization(Quantization::FullRange).is_err());
        assert!(s.set_colorspace(Colorspace::Rec709).is_err());
        assert!(s.restore_all().is_err());
        assert_eq!(s.overrides(), before);
    }

    #[test]
    fn debug_format() {
        let s = open(PixelFormat::Yuyv);
        let dbg = format!("{s:?}");
        assert!(dbg.contains("CaptureSession"));
        assert!(dbg.contains("PackedYuv"));
    }
}

//! Session-level flows: negotiation, color resolution, rendering and the dispatcher.

use vc_capture::{DeviceFormat, DeviceQueue, PlaneLayout, SyntheticDevice, SyntheticProbe};
use vc_common::{
    ColorAttributes, Colorspace, FormatError, FourCc, HsvEncoding, MatrixEncoding, OverrideSet,
    PixelFormat, ProfilePreference, Quantization, RenderError, SessionError, StaticCapabilities,
    TransferFunction, ViewerConfig, YCbCrEncoding,
};
use vc_render::{HeadlessBackend, RenderVariant};
use vc_session::{CaptureSession, Command, Dispatcher, ExitReason, TickOutcome};

type Session = CaptureSession<SyntheticDevice, HeadlessBackend>;

fn device_format(format: PixelFormat) -> DeviceFormat {
    DeviceFormat::new(format, 32, 16, ColorAttributes::default())
}

fn open_with(
    config: ViewerConfig,
    format: DeviceFormat,
    caps: StaticCapabilities,
) -> Result<(Session, SyntheticProbe), SessionError> {
    let device = SyntheticDevice::new(format, config.buffer_count);
    let probe = device.probe();
    let session = CaptureSession::open(config, device, HeadlessBackend::new(), &caps)?;
    Ok((session, probe))
}

fn open(format: PixelFormat) -> (Session, SyntheticProbe) {
    open_with(
        ViewerConfig::default(),
        device_format(format),
        StaticCapabilities::DESKTOP,
    )
    .unwrap()
}

// ── Color resolution scenarios ───────────────────────────────────────

#[test]
fn rgb24_without_colorspace_is_srgb() {
    let (session, _probe) = open(PixelFormat::Rgb24);
    let color = session.resolved_color().unwrap();
    assert_eq!(color.colorspace, Colorspace::Srgb);
    assert_eq!(color.transfer_function, TransferFunction::Srgb);
    assert_eq!(color.quantization, Quantization::FullRange);
    assert!(session.descriptor().unwrap().accepts_linear_to_srgb);
    assert_eq!(session.variant(), Some(RenderVariant::Rgb));
}

#[test]
fn planar_yuv_without_colorspace_is_broadcast() {
    let (session, _probe) = open(PixelFormat::Yuv420);
    let color = session.resolved_color().unwrap();
    assert_eq!(color.colorspace, Colorspace::Rec709);
    assert_eq!(color.transfer_function, TransferFunction::Rec709);
    assert_eq!(
        color.matrix_encoding,
        MatrixEncoding::YCbCr(YCbCrEncoding::Rec709)
    );
    assert_eq!(color.quantization, Quantization::LimitedRange);
    assert_eq!(session.variant(), Some(RenderVariant::PlanarYuv));
}

#[test]
fn quantization_override_changes_only_quantization() {
    let (mut session, _probe) = open(PixelFormat::Yuv420);
    let before = session.resolved_color().unwrap();

    session.set_quantization(Quantization::FullRange).unwrap();
    let after = session.resolved_color().unwrap();
    assert_eq!(after.quantization, Quantization::FullRange);
    assert_eq!(
        ColorAttributes {
            quantization: before.quantization,
            ..after
        },
        before
    );
    assert_eq!(session.stats().program_builds, 2);
}

#[test]
fn limited_range_rgb_disables_srgb_decode() {
    let (mut session, _probe) = open(PixelFormat::Bgr24);
    session.set_quantization(Quantization::LimitedRange).unwrap();
    assert!(!session.descriptor().unwrap().accepts_linear_to_srgb);

    session.restore_all().unwrap();
    assert!(session.overrides().is_empty());
    assert!(session.descriptor().unwrap().accepts_linear_to_srgb);
}

#[test]
fn hsv_ignores_matrix_override() {
    let color = ColorAttributes {
        matrix_encoding: MatrixEncoding::Hsv(HsvEncoding::Hue256),
        ..ColorAttributes::default()
    };
    let format = DeviceFormat::new(PixelFormat::Hsv24, 32, 16, color);
    let (mut session, _probe) =
        open_with(ViewerConfig::default(), format, StaticCapabilities::DESKTOP).unwrap();

    session
        .set_matrix_encoding(MatrixEncoding::Hsv(HsvEncoding::Hue180))
        .unwrap();
    assert_eq!(
        session.resolved_color().unwrap().matrix_encoding,
        MatrixEncoding::Hsv(HsvEncoding::Hue256)
    );
    assert_eq!(session.reported_color(), Some(color));
}

#[test]
fn initial_overrides_come_from_config() {
    let config: ViewerConfig = serde_json::from_str(
        r#"{"buffer_count":5,"overrides":{"colorspace":"Bt2020","quantization":"FullRange"}}"#,
    )
    .unwrap();
    let (session, _probe) = open_with(
        config,
        device_format(PixelFormat::Nv12),
        StaticCapabilities::DESKTOP,
    )
    .unwrap();
    let color = session.resolved_color().unwrap();
    assert_eq!(color.colorspace, Colorspace::Bt2020);
    assert_eq!(
        color.matrix_encoding,
        MatrixEncoding::YCbCr(YCbCrEncoding::Bt2020)
    );
    assert_eq!(color.quantization, Quantization::FullRange);
    assert_eq!(session.device().buffer_count(), 5);
}

// ── Format rejection ─────────────────────────────────────────────────

#[test]
fn unsupported_format_is_rejected() {
    let format = DeviceFormat {
        fourcc: FourCc::new(b"MJPG"),
        width: 32,
        height: 16,
        color: ColorAttributes::default(),
        planes: vec![PlaneLayout {
            bytes_per_line: 0,
            size_image: 4096,
        }],
    };
    let err = open_with(ViewerConfig::default(), format, StaticCapabilities::DESKTOP).unwrap_err();
    assert!(matches!(
        err,
        SessionError::FormatRejected(FormatError::Unsupported { fourcc }) if fourcc == FourCc::new(b"MJPG")
    ));
}

#[test]
fn desktop_only_format_on_embedded() {
    let err = open_with(
        ViewerConfig::default(),
        device_format(PixelFormat::Rgb332),
        StaticCapabilities::EMBEDDED,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SessionError::FormatRejected(FormatError::NeedsDesktopProfile { .. })
    ));
}

#[test]
fn forced_embedded_profile_applies_gate() {
    let config = ViewerConfig {
        profile: ProfilePreference::ForceEmbedded,
        ..ViewerConfig::default()
    };
    let err = open_with(
        config,
        device_format(PixelFormat::Xrgb555),
        StaticCapabilities::DESKTOP,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SessionError::FormatRejected(FormatError::NeedsDesktopProfile { .. })
    ));
}

#[test]
fn byte_swapped_grey_needs_extension() {
    let caps = StaticCapabilities {
        constrained_profile: false,
        byte_swap: false,
    };
    let err = open_with(
        ViewerConfig::default(),
        device_format(PixelFormat::Y16Be),
        caps,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SessionError::FormatRejected(FormatError::NeedsByteSwap { .. })
    ));
}

#[test]
fn too_few_buffers_is_a_config_error() {
    let config = ViewerConfig {
        buffer_count: 2,
        ..ViewerConfig::default()
    };
    let err = open_with(
        config,
        device_format(PixelFormat::Nv12),
        StaticCapabilities::DESKTOP,
    )
    .unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));
}

#[test]
fn capability_loss_rejects_current_format() {
    let (mut session, probe) = open(PixelFormat::Rgb555);
    session.device_mut().capture();
    session.handle_device_ready().unwrap();
    let err = session
        .capabilities_changed(&StaticCapabilities::EMBEDDED)
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::FormatRejected(FormatError::NeedsDesktopProfile { .. })
    ));
    assert!(session.is_closed());
    assert_eq!(probe.outstanding(), 0);
    assert!(matches!(
        session.handle_device_ready(),
        Err(SessionError::Closed)
    ));
}

#[test]
fn capability_change_rebuilds_program() {
    let (mut session, _probe) = open(PixelFormat::Nv12);
    session
        .capabilities_changed(&StaticCapabilities::EMBEDDED)
        .unwrap();
    assert_eq!(session.stats().program_builds, 2);
    assert!(session.capabilities().constrained_profile);
    assert_eq!(session.renderer().backend().live_programs(), 1);
}

// ── Rendering ────────────────────────────────────────────────────────

#[test]
fn frames_flow_to_the_renderer() {
    let (mut session, probe) = open(PixelFormat::Nv12);
    assert_eq!(session.render_tick().unwrap(), TickOutcome::Empty);

    session.device_mut().capture();
    assert_eq!(session.handle_device_ready().unwrap(), 1);
    assert_eq!(session.render_tick().unwrap(), TickOutcome::Uploaded);
    assert_eq!(session.render_tick().unwrap(), TickOutcome::Redrawn);

    let backend = session.renderer().backend();
    assert_eq!(backend.uploads().len(), 2);
    assert_eq!(backend.draws().len(), 2);
    assert_eq!(probe.outstanding(), 1);

    let stats = session.stats();
    assert_eq!(stats.pipeline.render_ticks, 3);
    assert_eq!(stats.pipeline.promotions, 1);
    assert!(stats.slowest_tick <= stats.render_time);
}

#[test]
fn short_buffer_is_skipped_not_fatal() {
    let mut format = device_format(PixelFormat::Rgb24);
    format.planes[0].size_image = 64;
    let (mut session, _probe) =
        open_with(ViewerConfig::default(), format, StaticCapabilities::DESKTOP).unwrap();

    session.device_mut().capture();
    session.handle_device_ready().unwrap();
    assert_eq!(session.render_tick().unwrap(), TickOutcome::Skipped);
    assert_eq!(session.stats().upload_failures, 1);
    assert!(session.renderer().backend().draws().is_empty());
}

#[test]
fn dequeue_failure_is_not_fatal() {
    let (mut session, _probe) = open(PixelFormat::Grey);
    session.device_mut().capture();
    session.device_mut().fail_next_dequeue();
    assert_eq!(session.handle_device_ready().unwrap(), 0);
    assert_eq!(session.handle_device_ready().unwrap(), 1);
    assert_eq!(session.stats().pipeline.dequeue_failures, 1);
}

#[test]
fn program_build_failure_is_fatal() {
    let (mut session, _probe) = open(PixelFormat::Nv12);
    session.renderer_mut().backend_mut().fail_builds(true);
    let err = session.set_quantization(Quantization::FullRange).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Render(RenderError::ProgramBuild { .. })
    ));
}

// ── Source changes ───────────────────────────────────────────────────

#[test]
fn source_change_renegotiates() {
    let (mut session, probe) = open(PixelFormat::Nv12);
    session.set_quantization(Quantization::FullRange).unwrap();
    session.device_mut().capture();
    session.handle_device_ready().unwrap();
    session.render_tick().unwrap();

    session.device_mut().set_source(device_format(PixelFormat::Rgb24));
    assert!(session.handle_device_events().unwrap());

    assert_eq!(session.variant(), Some(RenderVariant::Rgb));
    assert_eq!(session.held_buffers(), 0);
    assert_eq!(probe.outstanding(), 0);
    assert!(session.overrides().is_empty());
    assert_eq!(
        session.resolved_color().unwrap().colorspace,
        Colorspace::Srgb
    );
    assert_eq!(session.stats().negotiations, 2);

    session.device_mut().capture();
    session.handle_device_ready().unwrap();
    assert_eq!(session.render_tick().unwrap(), TickOutcome::Uploaded);
}

#[test]
fn no_events_means_no_renegotiation() {
    let (mut session, _probe) = open(PixelFormat::Nv12);
    assert!(!session.handle_device_events().unwrap());
}

#[test]
fn unsupported_source_change_is_fatal() {
    let (mut session, probe) = open(PixelFormat::Nv12);
    session.device_mut().capture();
    session.handle_device_ready().unwrap();

    let mut bad = device_format(PixelFormat::Nv12);
    bad.fourcc = FourCc::new(b"H264");
    session.device_mut().set_source(bad);

    let err = session.handle_device_events().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Renegotiation(FormatError::Unsupported { .. })
    ));
    assert_eq!(probe.outstanding(), 0);
    assert!(session.resolved_color().is_none());
    assert!(session.is_closed());

    session.device_mut().capture();
    assert!(matches!(
        session.handle_device_ready(),
        Err(SessionError::Closed)
    ));
    assert!(matches!(session.render_tick(), Err(SessionError::Closed)));
    assert_eq!(probe.outstanding(), 0);
}

// ── Teardown ─────────────────────────────────────────────────────────

#[test]
fn close_returns_held_buffers() {
    let (mut session, probe) = open(PixelFormat::Yuyv);
    session.device_mut().capture();
    session.handle_device_ready().unwrap();
    session.render_tick().unwrap();
    session.device_mut().capture();
    session.handle_device_ready().unwrap();
    assert_eq!(probe.outstanding(), 2);

    session.close().unwrap();
    assert_eq!(probe.outstanding(), 0);
    assert!(session.is_closed());
    assert_eq!(session.renderer().backend().live_programs(), 0);
}

#[test]
fn drop_drains_buffers() {
    let (mut session, probe) = open(PixelFormat::Yuyv);
    session.device_mut().capture();
    session.handle_device_ready().unwrap();
    drop(session);
    assert_eq!(probe.outstanding(), 0);
}

#[test]
fn abandon_keeps_buffers_with_caller() {
    let (mut session, probe) = open(PixelFormat::Yuyv);
    session.device_mut().capture();
    session.handle_device_ready().unwrap();
    session.abandon();
    drop(session);
    assert_eq!(probe.outstanding(), 1);
    assert!(probe.returned().is_empty());
}

// ── Dispatcher ───────────────────────────────────────────────────────

#[test]
fn dispatcher_handles_queued_work_then_shuts_down() {
    let (mut session, probe) = open(PixelFormat::Nv12);
    session.device_mut().capture_n(2);
    let (mut dispatcher, handle) = Dispatcher::new(session);

    assert!(handle.device_readable());
    assert!(handle.request_redraw());
    assert!(handle.request_redraw());
    assert!(handle.send(Command::SetQuantization(Quantization::FullRange)));
    assert!(handle.shutdown());

    assert_eq!(dispatcher.run().unwrap(), ExitReason::Shutdown);
    let session = dispatcher.into_session();
    assert!(session.is_closed());
    assert_eq!(probe.outstanding(), 0);
    assert_eq!(session.stats().pipeline.render_ticks, 1);
    assert_eq!(session.renderer().backend().draws().len(), 1);
    assert_eq!(
        session.resolved_color().unwrap().quantization,
        Quantization::FullRange
    );
}

#[test]
fn dispatcher_exits_when_handles_drop() {
    let (session, _probe) = open(PixelFormat::Grey);
    let (mut dispatcher, handle) = Dispatcher::new(session);
    assert!(handle.send(Command::SetQuantization(Quantization::FullRange)));
    drop(handle);
    assert_eq!(dispatcher.run().unwrap(), ExitReason::Disconnected);
    // Work queued before the drop is still handled.
    assert_eq!(
        dispatcher.session().overrides().quantization,
        Quantization::FullRange
    );
}

#[test]
fn dispatcher_surfaces_fatal_renegotiation() {
    let (mut session, probe) = open(PixelFormat::Nv12);
    session.device_mut().capture();
    let mut bad = device_format(PixelFormat::Nv12);
    bad.fourcc = FourCc::new(b"MJPG");
    let (mut dispatcher, handle) = Dispatcher::new(session);

    assert!(handle.device_readable());
    dispatcher.run_pending().unwrap();
    dispatcher.session_mut().device_mut().set_source(bad);
    assert!(handle.device_exception());

    let err = dispatcher.run().unwrap_err();
    assert!(matches!(err, SessionError::Renegotiation(_)));
    assert!(dispatcher.session().is_closed());
    assert_eq!(probe.outstanding(), 0);
}

#[test]
fn dispatcher_applies_capability_changes() {
    let (session, _probe) = open(PixelFormat::Nv12);
    let (mut dispatcher, handle) = Dispatcher::new(session);
    handle.send(Command::CapabilitiesChanged(StaticCapabilities::EMBEDDED));
    handle.send(Command::SetOverrides(OverrideSet {
        colorspace: Colorspace::Smpte170m,
        ..OverrideSet::default()
    }));
    assert_eq!(dispatcher.run_pending().unwrap(), None);

    let session = dispatcher.session();
    assert!(session.capabilities().constrained_profile);
    assert_eq!(
        session.resolved_color().unwrap().matrix_encoding,
        MatrixEncoding::YCbCr(YCbCrEncoding::Bt601)
    );
}

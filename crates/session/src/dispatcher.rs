//! Single-threaded event dispatcher.
//!
//! Device readiness, redraw requests and shell commands arrive on three
//! crossbeam channels and are consumed by one loop on the calling thread.
//! Each wake-up handles what is queued in a fixed order: device signals,
//! then one render tick (redraw requests coalesce), then commands.

use crossbeam::channel::{unbounded, Receiver, Select, Sender, TryRecvError};
use tracing::{debug, error, info, warn};

use vc_capture::DeviceQueue;
use vc_common::{
    Colorspace, MatrixEncoding, OverrideSet, Quantization, SessionResult, StaticCapabilities,
    TransferFunction,
};
use vc_render::RenderBackend;

use crate::session::CaptureSession;

/// Readiness reported by the device's file descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceSignal {
    /// A filled buffer can be dequeued.
    Readable,
    /// An event (source change) is pending.
    Exception,
}

/// Requests from the shell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    SetColorspace(Colorspace),
    SetTransferFunction(TransferFunction),
    SetMatrixEncoding(MatrixEncoding),
    SetQuantization(Quantization),
    SetOverrides(OverrideSet),
    RestoreAll,
    CapabilitiesChanged(StaticCapabilities),
    Shutdown,
}

/// Why the dispatcher loop ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// A `Shutdown` command was received.
    Shutdown,
    /// Every handle was dropped.
    Disconnected,
}

/// Sending side of the dispatcher's channels.
#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    device: Sender<DeviceSignal>,
    redraw: Sender<()>,
    commands: Sender<Command>,
}

impl DispatcherHandle {
    /// Returns `false` once the dispatcher has stopped.
    pub fn device_readable(&self) -> bool {
        self.device.send(DeviceSignal::Readable).is_ok()
    }

    pub fn device_exception(&self) -> bool {
        self.device.send(DeviceSignal::Exception).is_ok()
    }

    pub fn request_redraw(&self) -> bool {
        self.redraw.send(()).is_ok()
    }

    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }
}

/// Owns a session and drives it from the channels.
pub struct Dispatcher<D: DeviceQueue, B: RenderBackend> {
    session: CaptureSession<D, B>,
    device_rx: Receiver<DeviceSignal>,
    redraw_rx: Receiver<()>,
    command_rx: Receiver<Command>,
}

impl<D: DeviceQueue, B: RenderBackend> Dispatcher<D, B> {
    pub fn new(session: CaptureSession<D, B>) -> (Self, DispatcherHandle) {
        let (device, device_rx) = unbounded();
        let (redraw, redraw_rx) = unbounded();
        let (commands, command_rx) = unbounded();
        let dispatcher = Self {
            session,
            device_rx,
            redraw_rx,
            command_rx,
        };
        let handle = DispatcherHandle {
            device,
            redraw,
            commands,
        };
        (dispatcher, handle)
    }

    /// Block and dispatch until shutdown, disconnection or a fatal error.
    ///
    /// The session is closed (held buffers drained) before returning.
    pub fn run(&mut self) -> SessionResult<ExitReason> {
        info!("Dispatcher started");
        let outcome = loop {
            self.wait();
            match self.run_pending() {
                Ok(Some(reason)) => break Ok(reason),
                Ok(None) => {}
                Err(e) => break Err(e),
            }
        };

        match outcome {
            Ok(reason) => {
                self.session.close()?;
                info!(reason = ?reason, "Dispatcher stopped");
                Ok(reason)
            }
            Err(e) => {
                error!(error = %e, "Fatal session error");
                if let Err(close_err) = self.session.close() {
                    warn!(error = %close_err, "Drain after fatal error failed");
                }
                Err(e)
            }
        }
    }

    /// Handle everything queued right now without blocking.
    ///
    /// Returns `Some` when the loop should stop.
    pub fn run_pending(&mut self) -> SessionResult<Option<ExitReason>> {
        let mut disconnected = false;
        loop {
            match self.device_rx.try_recv() {
                Ok(DeviceSignal::Readable) => {
                    self.session.handle_device_ready()?;
                }
                Ok(DeviceSignal::Exception) => {
                    self.session.handle_device_events()?;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        let mut redraws = 0usize;
        loop {
            match self.redraw_rx.try_recv() {
                Ok(()) => redraws += 1,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        if redraws > 0 {
            if redraws > 1 {
                debug!(coalesced = redraws, "Coalesced redraw requests");
            }
            self.session.render_tick()?;
        }

        loop {
            match self.command_rx.try_recv() {
                Ok(Command::Shutdown) => return Ok(Some(ExitReason::Shutdown)),
                Ok(command) => self.apply(command)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        Ok(disconnected.then_some(ExitReason::Disconnected))
    }

    pub fn session(&self) -> &CaptureSession<D, B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CaptureSession<D, B> {
        &mut self.session
    }

    pub fn into_session(self) -> CaptureSession<D, B> {
        self.session
    }

    // ── internal helpers ──────────────────────────────────────────

    /// Sleep until any channel is ready or disconnected.
    fn wait(&self) {
        let mut sel = Select::new();
        sel.recv(&self.device_rx);
        sel.recv(&self.redraw_rx);
        sel.recv(&self.command_rx);
        sel.ready();
    }

    fn apply(&mut self, command: Command) -> SessionResult<()> {
        debug!(command = ?command, "Command");
        match command {
            Command::SetColorspace(v) => self.session.set_colorspace(v),
            Command::SetTransferFunction(v) => self.session.set_transfer_function(v),
            Command::SetMatrixEncoding(v) => self.session.set_matrix_encoding(v),
            Command::SetQuantization(v) => self.session.set_quantization(v),
            Command::SetOverrides(v) => self.session.set_overrides(v),
            Command::RestoreAll => self.session.restore_all(),
            Command::CapabilitiesChanged(caps) => self.session.capabilities_changed(&caps),
            Command::Shutdown => Ok(()),
        }
    }
}

impl<D: DeviceQueue, B: RenderBackend> std::fmt::Debug for Dispatcher<D, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("session", &self.session)
            .field("queued_device", &self.device_rx.len())
            .field("queued_redraw", &self.redraw_rx.len())
            .field("queued_commands", &self.command_rx.len())
            .finish()
    }
}

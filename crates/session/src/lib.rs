//! `vc-session` — Capture session orchestration and the event dispatcher.
//!
//! - **Session**: `CaptureSession` (negotiation, overrides, render ticks, teardown)
//! - **Dispatcher**: `Dispatcher` loop over crossbeam channels, `DispatcherHandle`

pub mod dispatcher;
pub mod session;

pub use dispatcher::{Command, DeviceSignal, Dispatcher, DispatcherHandle, ExitReason};
pub use session::{CaptureSession, SessionStats, TickOutcome};

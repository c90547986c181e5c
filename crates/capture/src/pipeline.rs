//! Frame Pipeline — two-slot hand-off from the device queue to the renderer.
//!
//! The pipeline holds at most two device buffers:
//!
//! - `pending`: the newest arrival, not yet shown.
//! - `displayed`: the buffer whose content is bound to the GPU textures.
//!
//! Every other buffer stays with the device. An arrival that finds `pending`
//! occupied returns the superseded buffer at once; a render tick promotes
//! `pending` to `displayed` and returns the previously displayed buffer.
//! Producer and consumer run on the same thread, so no locking is involved.

use tracing::{debug, trace, warn};

use vc_common::DeviceError;

use crate::device::DeviceQueue;
use crate::frame::FrameSlot;

/// Counters describing pipeline activity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Buffers received from the device.
    pub arrivals: u64,
    /// Pending buffers promoted to displayed.
    pub promotions: u64,
    /// Pending buffers replaced by a newer arrival before being shown.
    pub superseded: u64,
    /// Buffers handed back to the device.
    pub returned: u64,
    /// Failed dequeue attempts (skipped, not fatal).
    pub dequeue_failures: u64,
    /// Render ticks observed.
    pub render_ticks: u64,
    /// Format-change invalidations.
    pub invalidations: u64,
}

/// What a render tick has to show.
#[derive(Debug)]
pub enum TickFrame<'a> {
    /// Newly promoted buffer; its planes must be uploaded.
    Fresh(&'a FrameSlot),
    /// No new arrival; the displayed buffer is already on the GPU.
    Stale(&'a FrameSlot),
    /// Nothing has arrived yet.
    Empty,
}

impl<'a> TickFrame<'a> {
    pub fn slot(&self) -> Option<&'a FrameSlot> {
        match *self {
            Self::Fresh(slot) | Self::Stale(slot) => Some(slot),
            Self::Empty => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// Two-slot frame pipeline over a device queue.
pub struct FramePipeline<Q: DeviceQueue> {
    device: Q,
    pending: Option<FrameSlot>,
    displayed: Option<FrameSlot>,
    next_sequence: u64,
    stats: PipelineStats,
}

impl<Q: DeviceQueue> FramePipeline<Q> {
    pub fn new(device: Q) -> Self {
        Self {
            device,
            pending: None,
            displayed: None,
            next_sequence: 1,
            stats: PipelineStats::default(),
        }
    }

    /// Dequeue every ready buffer, in device order.
    ///
    /// A dequeue failure ends the poll and is only counted. Returns the
    /// number of arrivals processed.
    pub fn poll_device(&mut self) -> Result<usize, DeviceError> {
        let mut arrived = 0;
        loop {
            match self.device.dequeue_ready() {
                Ok(Some(slot)) => {
                    self.on_arrival(slot)?;
                    arrived += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    self.stats.dequeue_failures += 1;
                    warn!(error = %e, "Dequeue failed, skipping");
                    break;
                }
            }
        }
        Ok(arrived)
    }

    /// Record a freshly dequeued buffer as `pending`.
    ///
    /// A previous pending buffer that was never shown goes straight back to
    /// the device.
    pub fn on_arrival(&mut self, mut slot: FrameSlot) -> Result<(), DeviceError> {
        slot.stamp(self.next_sequence);
        self.next_sequence += 1;
        self.stats.arrivals += 1;
        trace!(
            index = slot.index(),
            sequence = slot.arrival_sequence(),
            "Buffer arrived"
        );

        if let Some(superseded) = self.pending.replace(slot) {
            self.stats.superseded += 1;
            trace!(index = superseded.index(), "Superseded before display");
            self.give_back(superseded)?;
        }
        Ok(())
    }

    /// Promote `pending` (if any) and report what should be on screen.
    pub fn on_render_tick(&mut self) -> Result<TickFrame<'_>, DeviceError> {
        self.stats.render_ticks += 1;

        let Some(next) = self.pending.take() else {
            return Ok(match &self.displayed {
                Some(slot) => TickFrame::Stale(slot),
                None => TickFrame::Empty,
            });
        };

        self.stats.promotions += 1;
        // The outgoing buffer was uploaded on its own tick.
        if let Some(previous) = self.displayed.replace(next) {
            self.give_back(previous)?;
        }
        Ok(match &self.displayed {
            Some(slot) => TickFrame::Fresh(slot),
            None => TickFrame::Empty,
        })
    }

    /// Drop both slots after a format change, returning them to the device.
    pub fn invalidate(&mut self) -> Result<(), DeviceError> {
        self.stats.invalidations += 1;
        debug!(held = self.held_count(), "Invalidating frame slots");
        self.drain()
    }

    /// Return every held buffer to the device.
    pub fn drain(&mut self) -> Result<(), DeviceError> {
        // Return both even if the first fails.
        let pending = self.pending.take().map(|s| self.give_back(s));
        let displayed = self.displayed.take().map(|s| self.give_back(s));
        pending.unwrap_or(Ok(())).and(displayed.unwrap_or(Ok(())))
    }

    /// Forget held buffers without returning them.
    ///
    /// Only valid when the device handle itself is being closed, which
    /// releases its buffer arena along with every outstanding pointer.
    pub fn abandon(&mut self) {
        let held = self.held_count();
        self.pending = None;
        self.displayed = None;
        if held > 0 {
            debug!(held, "Abandoned held buffers");
        }
    }

    /// Buffers currently held outside the device queue (0..=2).
    pub fn held_count(&self) -> usize {
        usize::from(self.pending.is_some()) + usize::from(self.displayed.is_some())
    }

    pub fn pending(&self) -> Option<&FrameSlot> {
        self.pending.as_ref()
    }

    pub fn displayed(&self) -> Option<&FrameSlot> {
        self.displayed.as_ref()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn device(&self) -> &Q {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Q {
        &mut self.device
    }

    // ── internal helpers ──────────────────────────────────────────

    fn give_back(&mut self, slot: FrameSlot) -> Result<(), DeviceError> {
        let index = slot.index();
        self.device.enqueue(slot)?;
        self.stats.returned += 1;
        trace!(index, "Buffer returned to device");
        Ok(())
    }
}

impl<Q: DeviceQueue> std::fmt::Debug for FramePipeline<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("pending", &self.pending.as_ref().map(FrameSlot::index))
            .field("displayed", &self.displayed.as_ref().map(FrameSlot::index))
            .field("stats", &self.stats)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

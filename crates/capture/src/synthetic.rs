//! Synthetic capture device.
//!
//! A host-memory stand-in for a mapped driver queue. Buffers cycle through
//! the same states as on a real device (queued, filled, dequeued) and every
//! hand-back is recorded on a shared [`SyntheticProbe`] so callers can watch
//! buffer custody while the device itself is owned by a pipeline. The probe
//! keeps the newest [`RETURN_LOG_LIMIT`] hand-backs.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use vc_common::DeviceError;

use crate::device::{DeviceEvent, DeviceFormat, DeviceQueue};
use crate::frame::FrameSlot;

/// Hand-backs kept by a [`SyntheticProbe`].
pub const RETURN_LOG_LIMIT: usize = 1024;

#[derive(Debug, Default)]
struct ProbeState {
    returned: VecDeque<u32>,
    returned_count: u64,
    outstanding: usize,
    max_outstanding: usize,
}

/// Shared view of a [`SyntheticDevice`]'s buffer custody.
#[derive(Clone, Debug, Default)]
pub struct SyntheticProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl SyntheticProbe {
    /// Most recent buffer indices handed back to the device, oldest first.
    pub fn returned(&self) -> Vec<u32> {
        self.state.lock().returned.iter().copied().collect()
    }

    /// Hand-backs since creation.
    pub fn returned_count(&self) -> u64 {
        self.state.lock().returned_count
    }

    /// Buffers currently dequeued and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Highest `outstanding` value seen so far.
    pub fn max_outstanding(&self) -> usize {
        self.state.lock().max_outstanding
    }

    fn on_dequeue(&self) {
        let mut state = self.state.lock();
        state.outstanding += 1;
        state.max_outstanding = state.max_outstanding.max(state.outstanding);
    }

    fn on_enqueue(&self, index: u32) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.returned.len() == RETURN_LOG_LIMIT {
            state.returned.pop_front();
        }
        state.returned.push_back(index);
        state.returned_count += 1;
    }
}

/// Test-pattern device with host-allocated buffers.
pub struct SyntheticDevice {
    format: DeviceFormat,
    buffers: Vec<Vec<Box<[u8]>>>,
    dequeued: Vec<bool>,
    /// Owned by the device, waiting to be filled.
    queued: VecDeque<u32>,
    /// Filled, waiting to be dequeued.
    ready: VecDeque<u32>,
    events: VecDeque<DeviceEvent>,
    subscribed: bool,
    fail_next_dequeue: bool,
    frames: u64,
    probe: SyntheticProbe,
}

impl SyntheticDevice {
    pub fn new(format: DeviceFormat, buffer_count: u32) -> Self {
        let buffers = (0..buffer_count).map(|_| allocate(&format)).collect();
        Self {
            format,
            buffers,
            dequeued: vec![false; buffer_count as usize],
            queued: (0..buffer_count).collect(),
            ready: VecDeque::new(),
            events: VecDeque::new(),
            subscribed: false,
            fail_next_dequeue: false,
            frames: 0,
            probe: SyntheticProbe::default(),
        }
    }

    pub fn probe(&self) -> SyntheticProbe {
        self.probe.clone()
    }

    /// Fill the next queued buffer with a frame.
    ///
    /// Returns `false` when every buffer is held elsewhere (overrun).
    pub fn capture(&mut self) -> bool {
        let Some(index) = self.queued.pop_front() else {
            debug!("Synthetic device overrun, no queued buffer");
            return false;
        };
        self.frames += 1;
        let fill = pattern_byte(self.frames);
        let planes = &mut self.buffers[index as usize];
        // Only buffers in device custody are resized.
        if !matches_layout(planes, &self.format) {
            *planes = allocate(&self.format);
        }
        for plane in planes.iter_mut() {
            plane.fill(fill);
        }
        self.ready.push_back(index);
        true
    }

    /// Capture up to `n` frames; returns how many were produced.
    pub fn capture_n(&mut self, n: usize) -> usize {
        (0..n).take_while(|_| self.capture()).count()
    }

    /// Switch to a new input format, raising a source-change event when subscribed.
    ///
    /// Filled buffers not yet dequeued are dropped back into the capture queue.
    pub fn set_source(&mut self, format: DeviceFormat) {
        self.format = format;
        self.queued.extend(self.ready.drain(..));
        if self.subscribed {
            self.events.push_back(DeviceEvent::SourceChange);
        }
    }

    pub fn fail_next_dequeue(&mut self) {
        self.fail_next_dequeue = true;
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames
    }
}

/// Byte value every plane of frame `n` is filled with.
pub fn pattern_byte(frame: u64) -> u8 {
    (frame & 0xff) as u8
}

fn allocate(format: &DeviceFormat) -> Vec<Box<[u8]>> {
    format
        .planes
        .iter()
        .map(|p| vec![0u8; p.size_image as usize].into_boxed_slice())
        .collect()
}

fn matches_layout(planes: &[Box<[u8]>], format: &DeviceFormat) -> bool {
    planes.len() == format.planes.len()
        && planes
            .iter()
            .zip(&format.planes)
            .all(|(b, p)| b.len() == p.size_image as usize)
}

impl DeviceQueue for SyntheticDevice {
    fn dequeue_ready(&mut self) -> Result<Option<FrameSlot>, DeviceError> {
        if std::mem::take(&mut self.fail_next_dequeue) {
            return Err(DeviceError::Dequeue("injected failure".into()));
        }
        let Some(index) = self.ready.pop_front() else {
            return Ok(None);
        };
        let planes: Vec<(*const u8, usize)> = self.buffers[index as usize]
            .iter()
            .map(|p| (p.as_ptr(), p.len()))
            .collect();
        // SAFETY: the boxes are only resized or refilled while in device
        // custody, and custody returns only through `enqueue`, which consumes
        // the slot.
        let slot = unsafe { FrameSlot::from_raw_parts(index, &planes) };
        self.dequeued[index as usize] = true;
        self.probe.on_dequeue();
        Ok(Some(slot))
    }

    fn enqueue(&mut self, slot: FrameSlot) -> Result<(), DeviceError> {
        let index = slot.index();
        match self.dequeued.get_mut(index as usize) {
            Some(flag) if *flag => *flag = false,
            _ => {
                return Err(DeviceError::Enqueue {
                    index,
                    reason: "buffer is not dequeued".into(),
                })
            }
        }
        self.queued.push_back(index);
        self.probe.on_enqueue(index);
        Ok(())
    }

    fn subscribe_source_change(&mut self) -> Result<(), DeviceError> {
        self.subscribed = true;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<DeviceEvent>, DeviceError> {
        Ok(self.events.pop_front())
    }

    fn current_format(&mut self) -> Result<DeviceFormat, DeviceError> {
        Ok(self.format.clone())
    }

    fn buffer_count(&self) -> u32 {
        self.buffers.len() as u32
    }
}

impl std::fmt::Debug for SyntheticDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticDevice")
            .field("fourcc", &self.format.fourcc.to_string())
            .field("buffers", &self.buffers.len())
            .field("queued", &self.queued.len())
            .field("ready", &self.ready.len())
            .field("frames", &self.frames)
            .finish()
    }
}

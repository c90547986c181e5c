//! Non-owning references to device buffers.

use std::fmt;

/// Maximum memory planes of any supported format.
pub const MAX_PLANES: usize = 3;

#[derive(Copy, Clone)]
struct PlaneRef {
    ptr: *const u8,
    len: usize,
}

impl PlaneRef {
    const EMPTY: Self = Self {
        ptr: std::ptr::null(),
        len: 0,
    };
}

/// One dequeued device buffer.
///
/// The plane memory belongs to the device's mapped arena. A slot is not
/// `Clone`: handing it back through [`DeviceQueue::enqueue`] consumes it, so
/// its pointers cannot be reached once the device owns the buffer again.
///
/// [`DeviceQueue::enqueue`]: crate::device::DeviceQueue::enqueue
pub struct FrameSlot {
    index: u32,
    sequence: u64,
    planes: [PlaneRef; MAX_PLANES],
    plane_count: usize,
}

impl FrameSlot {
    /// Wrap the planes of a freshly dequeued buffer.
    ///
    /// Planes beyond [`MAX_PLANES`] are ignored.
    ///
    /// # Safety
    ///
    /// Each `(ptr, len)` must describe readable memory that stays valid and
    /// unmodified until this slot is handed back to the queue that produced it.
    pub unsafe fn from_raw_parts(index: u32, planes: &[(*const u8, usize)]) -> Self {
        let mut refs = [PlaneRef::EMPTY; MAX_PLANES];
        let plane_count = planes.len().min(MAX_PLANES);
        for (dst, &(ptr, len)) in refs.iter_mut().zip(planes) {
            *dst = PlaneRef { ptr, len };
        }
        Self {
            index,
            sequence: 0,
            planes: refs,
            plane_count,
        }
    }

    /// Device buffer index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Position of this buffer in arrival order, starting at 1.
    pub fn arrival_sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn stamp(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    pub fn plane_count(&self) -> usize {
        self.plane_count
    }

    /// Bytes of plane `i`, or `None` past the last plane.
    pub fn plane(&self, i: usize) -> Option<&[u8]> {
        if i >= self.plane_count {
            return None;
        }
        let plane = self.planes[i];
        if plane.ptr.is_null() || plane.len == 0 {
            return Some(&[]);
        }
        // SAFETY: from_raw_parts requires the memory to stay valid while the
        // slot exists, and slots are consumed when returned to the device.
        Some(unsafe { std::slice::from_raw_parts(plane.ptr, plane.len) })
    }

    pub fn bytes_used(&self) -> usize {
        self.planes[..self.plane_count].iter().map(|p| p.len).sum()
    }
}

impl fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lens: Vec<usize> = self.planes[..self.plane_count]
            .iter()
            .map(|p| p.len)
            .collect();
        f.debug_struct("FrameSlot")
            .field("index", &self.index)
            .field("sequence", &self.sequence)
            .field("plane_lens", &lens)
            .finish()
    }
}

//! Capture device abstraction.
//!
//! The pipeline and session program against [`DeviceQueue`], never against a
//! concrete driver. The device owns the buffer memory; only indices and plane
//! pointers cross this boundary.

use serde::{Deserialize, Serialize};

use vc_common::{ColorAttributes, DeviceError, FormatFamily, FourCc, PixelFormat};

use crate::frame::FrameSlot;

/// Asynchronous notifications from the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The input signal changed; the format must be queried again.
    SourceChange,
}

/// Per-plane memory layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneLayout {
    pub bytes_per_line: u32,
    pub size_image: u32,
}

/// The format currently produced by the device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFormat {
    pub fourcc: FourCc,
    pub width: u32,
    pub height: u32,
    /// Color attributes as reported; fields may be `Unspecified`.
    pub color: ColorAttributes,
    pub planes: Vec<PlaneLayout>,
}

impl DeviceFormat {
    /// Tightly packed layout for a supported format.
    pub fn new(format: PixelFormat, width: u32, height: u32, color: ColorAttributes) -> Self {
        let desc = format.descriptor();
        let bytes_per_line = width * u32::from(desc.bytes_per_pixel);
        let luma = PlaneLayout {
            bytes_per_line,
            size_image: bytes_per_line * height,
        };

        let (h, v) = desc.chroma.map_or((1, 1), |c| c.factors());
        let chroma_line = bytes_per_line / h;
        let chroma_rows = height / v;
        // Planar formats carry two chroma planes, NV formats one interleaved plane.
        let chroma = match desc.family {
            FormatFamily::PlanarYuv => Some((
                PlaneLayout {
                    bytes_per_line: chroma_line,
                    size_image: chroma_line * chroma_rows,
                },
                2usize,
            )),
            FormatFamily::SemiplanarNv => Some((
                PlaneLayout {
                    bytes_per_line: chroma_line * 2,
                    size_image: chroma_line * 2 * chroma_rows,
                },
                1,
            )),
            _ => None,
        };

        let planes = match (desc.mem_planes, chroma) {
            (1, Some((c, n))) => vec![PlaneLayout {
                bytes_per_line,
                size_image: luma.size_image + c.size_image * n as u32,
            }],
            (_, Some((c, n))) => {
                let mut planes = vec![luma];
                planes.extend(std::iter::repeat(c).take(n));
                planes
            }
            (_, None) => vec![luma],
        };

        Self {
            fourcc: format.fourcc(),
            width,
            height,
            color,
            planes,
        }
    }
}

/// A device's buffer queue and event source.
pub trait DeviceQueue {
    /// Take the next filled buffer, or `None` if none is ready.
    fn dequeue_ready(&mut self) -> Result<Option<FrameSlot>, DeviceError>;

    /// Give a buffer back to the device. The slot's pointers die here.
    fn enqueue(&mut self, slot: FrameSlot) -> Result<(), DeviceError>;

    /// Ask the device to report source changes through [`poll_event`](Self::poll_event).
    fn subscribe_source_change(&mut self) -> Result<(), DeviceError>;

    /// Next pending event, or `None` when the event queue is empty.
    fn poll_event(&mut self) -> Result<Option<DeviceEvent>, DeviceError>;

    /// Query the format the device is producing now.
    fn current_format(&mut self) -> Result<DeviceFormat, DeviceError>;

    /// Number of buffers allocated on the device.
    fn buffer_count(&self) -> u32;
}

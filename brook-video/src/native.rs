//! Native (GPU/texture-backed) video buffers.

use std::sync::Arc;

use crate::i420::I420Buffer;

/// A platform handle backing a video frame that lives outside CPU memory,
/// typically a GPU texture.
///
/// Implemented by platform capture/render layers. `read_back` is the one
/// seam where pixel data crosses from the device to the CPU; it may block
/// on the device for a readback and colorspace conversion.
pub trait NativeHandle: Send + Sync {
    /// Frame width in pixels.
    fn width(&self) -> u32;

    /// Frame height in pixels.
    fn height(&self) -> u32;

    /// Read the texture back into an owned I420 buffer.
    ///
    /// Potentially expensive (device synchronisation + conversion); never
    /// called implicitly by this crate.
    fn read_back(&self) -> I420Buffer;
}

/// A frame buffer wrapping a [`NativeHandle`] instead of raw pixel memory.
#[derive(Clone)]
pub struct NativeBuffer {
    handle: Arc<dyn NativeHandle>,
}

impl NativeBuffer {
    pub fn new(handle: Arc<dyn NativeHandle>) -> Self {
        Self { handle }
    }

    pub fn width(&self) -> u32 {
        self.handle.width()
    }

    pub fn height(&self) -> u32 {
        self.handle.height()
    }

    /// The wrapped platform handle.
    pub fn handle(&self) -> &Arc<dyn NativeHandle> {
        &self.handle
    }

    /// Read back into CPU memory. See [`NativeHandle::read_back`] for cost.
    pub fn to_i420(&self) -> I420Buffer {
        tracing::debug!(
            width = self.width(),
            height = self.height(),
            "reading back native buffer to i420"
        );
        self.handle.read_back()
    }
}

impl std::fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

//! The raw video frame envelope and the push-model frame sink.

use std::sync::Arc;

use crate::buffer::VideoFrameBuffer;

/// Clockwise rotation to apply before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoRotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl VideoRotation {
    pub fn degrees(&self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether applying this rotation swaps width and height.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// A raw video frame: shared pixel buffer plus delivery metadata.
///
/// Cloning a frame shares the buffer (refcount bump), which is also the
/// retain step a consumer performs before handing the frame to another
/// thread.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    buffer: Arc<VideoFrameBuffer>,
    rotation: VideoRotation,
    timestamp_us: i64,
}

impl VideoFrame {
    pub fn new(buffer: Arc<VideoFrameBuffer>, rotation: VideoRotation, timestamp_us: i64) -> Self {
        Self {
            buffer,
            rotation,
            timestamp_us,
        }
    }

    pub fn buffer(&self) -> &Arc<VideoFrameBuffer> {
        &self.buffer
    }

    pub fn rotation(&self) -> VideoRotation {
        self.rotation
    }

    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    /// Buffer width (pre-rotation).
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Buffer height (pre-rotation).
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }
}

/// A consumer of a stream of raw video frames.
///
/// Implemented by renderers, encoders, and the broadcaster. Frames arrive by
/// shared reference; a sink that needs to keep the frame clones it (cheap,
/// since the pixel buffer is shared).
pub trait VideoSink: Send + Sync {
    fn on_frame(&self, frame: &VideoFrame);
}

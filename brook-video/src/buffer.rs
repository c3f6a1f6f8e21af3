//! The closed video frame buffer family.

use crate::i420::I420Buffer;
use crate::i444::I444Buffer;
use crate::native::NativeBuffer;

/// Tag identifying the concrete encoding of a [`VideoFrameBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoBufferType {
    I420,
    I444,
    Native,
}

/// A video frame's pixel data in one of a closed set of encodings.
///
/// The set is closed by design: adding a pixel format means adding a
/// variant and updating every match, not falling back through a
/// recoverable-error path. Accessing the wrong variant is a programmer
/// error and panics; callers check [`buffer_type`](Self::buffer_type)
/// first.
///
/// Buffers are immutable once constructed and shared via
/// `Arc<VideoFrameBuffer>`; concurrent readers need no locking.
#[derive(Debug, Clone)]
pub enum VideoFrameBuffer {
    I420(I420Buffer),
    I444(I444Buffer),
    Native(NativeBuffer),
}

impl VideoFrameBuffer {
    pub fn buffer_type(&self) -> VideoBufferType {
        match self {
            Self::I420(_) => VideoBufferType::I420,
            Self::I444(_) => VideoBufferType::I444,
            Self::Native(_) => VideoBufferType::Native,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Self::I420(b) => b.width(),
            Self::I444(b) => b.width(),
            Self::Native(b) => b.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::I420(b) => b.height(),
            Self::I444(b) => b.height(),
            Self::Native(b) => b.height(),
        }
    }

    /// Access the I420 data. Panics if this is not an I420 buffer.
    pub fn as_i420(&self) -> &I420Buffer {
        match self {
            Self::I420(b) => b,
            other => panic!("as_i420 called on {:?} buffer", other.buffer_type()),
        }
    }

    /// Access the I444 data. Panics if this is not an I444 buffer.
    pub fn as_i444(&self) -> &I444Buffer {
        match self {
            Self::I444(b) => b,
            other => panic!("as_i444 called on {:?} buffer", other.buffer_type()),
        }
    }

    /// Access the native handle. Panics if this is not a native buffer.
    pub fn as_native(&self) -> &NativeBuffer {
        match self {
            Self::Native(b) => b,
            other => panic!("as_native called on {:?} buffer", other.buffer_type()),
        }
    }

    /// Obtain this frame's pixels as an I420 buffer.
    ///
    /// For an I420 source this is a refcount bump on the existing planes
    /// (no pixel copy, since buffers are immutable). For I444 it performs the
    /// chroma subsampling conversion. For native buffers it triggers the
    /// handle's readback, which may block on the device; keep it off
    /// latency-sensitive paths.
    pub fn to_i420(&self) -> I420Buffer {
        match self {
            Self::I420(b) => b.clone(),
            Self::I444(b) => b.to_i420(),
            Self::Native(b) => b.to_i420(),
        }
    }
}

impl From<I420Buffer> for VideoFrameBuffer {
    fn from(buffer: I420Buffer) -> Self {
        Self::I420(buffer)
    }
}

impl From<I444Buffer> for VideoFrameBuffer {
    fn from(buffer: I444Buffer) -> Self {
        Self::I444(buffer)
    }
}

impl From<NativeBuffer> for VideoFrameBuffer {
    fn from(buffer: NativeBuffer) -> Self {
        Self::Native(buffer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::native::NativeHandle;

    #[test]
    fn type_tags_match_variants() {
        let i420: VideoFrameBuffer = I420Buffer::new(4, 4).into();
        let i444: VideoFrameBuffer = I444Buffer::new(4, 4).into();
        assert_eq!(i420.buffer_type(), VideoBufferType::I420);
        assert_eq!(i444.buffer_type(), VideoBufferType::I444);
    }

    #[test]
    fn dimensions_delegate_to_variant() {
        let buffer: VideoFrameBuffer = I444Buffer::new(320, 240).into();
        assert_eq!(buffer.width(), 320);
        assert_eq!(buffer.height(), 240);
    }

    #[test]
    #[should_panic(expected = "as_i444 called on I420 buffer")]
    fn wrong_variant_access_panics() {
        let buffer: VideoFrameBuffer = I420Buffer::new(4, 4).into();
        let _ = buffer.as_i444();
    }

    #[test]
    #[should_panic(expected = "as_i420 called on I444 buffer")]
    fn wrong_variant_access_panics_the_other_way() {
        let buffer: VideoFrameBuffer = I444Buffer::new(4, 4).into();
        let _ = buffer.as_i420();
    }

    #[test]
    fn to_i420_on_i420_shares_planes() {
        let source = I420Buffer::new(8, 8);
        let source_ptr = source.data_y().as_ptr();
        let buffer: VideoFrameBuffer = source.into();

        let converted = buffer.to_i420();
        assert_eq!(converted.data_y().as_ptr(), source_ptr);
    }

    #[test]
    fn to_i420_on_i444_produces_subsampled_buffer() {
        let buffer: VideoFrameBuffer = I444Buffer::new(6, 4).into();
        let converted = buffer.to_i420();
        assert_eq!(converted.width(), 6);
        assert_eq!(converted.chroma_width(), 3);
    }

    struct OnePixelTexture;

    impl NativeHandle for OnePixelTexture {
        fn width(&self) -> u32 {
            1
        }

        fn height(&self) -> u32 {
            1
        }

        fn read_back(&self) -> I420Buffer {
            I420Buffer::black(1, 1)
        }
    }

    #[test]
    fn to_i420_on_native_reads_back() {
        let buffer: VideoFrameBuffer = NativeBuffer::new(Arc::new(OnePixelTexture)).into();
        let converted = buffer.to_i420();
        assert_eq!(converted.width(), 1);
        assert_eq!(converted.data_y(), &[16]);
    }

    #[test]
    fn wrap_release_fires_once_even_after_to_i420_clones() {
        let fired = Arc::new(AtomicU32::new(0));
        let fired2 = Arc::clone(&fired);

        let buffer: VideoFrameBuffer = I420Buffer::wrap(
            2,
            2,
            2,
            Bytes::from_static(&[0; 4]),
            1,
            Bytes::from_static(&[0; 1]),
            1,
            Bytes::from_static(&[0; 1]),
            move || {
                fired2.fetch_add(1, Ordering::SeqCst);
            },
        )
        .into();

        // to_i420 on an I420 source clones the buffer, sharing the guard.
        let converted = buffer.to_i420();
        drop(buffer);
        assert_eq!(fired.load(Ordering::SeqCst), 0, "conversion still alive");

        drop(converted);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}

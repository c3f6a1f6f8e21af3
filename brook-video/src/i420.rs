//! I420 (YUV 4:2:0 planar) pixel buffer.

use std::sync::Arc;

use bytes::Bytes;

use crate::release::ReleaseGuard;

/// Luma value for black in limited-range YUV.
const BLACK_Y: u8 = 16;
/// Chroma value for black (neutral).
const BLACK_UV: u8 = 128;

/// An I420 planar buffer: full-resolution Y plane, chroma subsampled 2:1 in
/// both axes.
///
/// Pixel data is immutable after construction and shared by reference count:
/// cloning an `I420Buffer` bumps the underlying plane refcounts without
/// copying pixels. Chroma dimensions are always derived from the luma
/// dimensions by ceiling division, never stored.
#[derive(Clone)]
pub struct I420Buffer {
    width: u32,
    height: u32,
    stride_y: u32,
    stride_u: u32,
    stride_v: u32,
    y: Bytes,
    u: Bytes,
    v: Bytes,
    /// Present only on wrapped (non-owning) buffers.
    release: Option<Arc<ReleaseGuard>>,
}

impl I420Buffer {
    /// Allocate a zero-initialised buffer with tightly packed strides.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0, 0, 0)
    }

    /// Allocate a buffer filled with black (Y=16, U=V=128, limited range).
    pub fn black(width: u32, height: u32) -> Self {
        Self::filled(width, height, BLACK_Y, BLACK_UV, BLACK_UV)
    }

    fn filled(width: u32, height: u32, y: u8, u: u8, v: u8) -> Self {
        assert!(
            width > 0 && height > 0,
            "i420 buffer dimensions must be non-zero, got {width}x{height}"
        );
        let chroma_width = (width + 1) / 2;
        let chroma_height = (height + 1) / 2;
        Self {
            width,
            height,
            stride_y: width,
            stride_u: chroma_width,
            stride_v: chroma_width,
            y: Bytes::from(vec![y; (width * height) as usize]),
            u: Bytes::from(vec![u; (chroma_width * chroma_height) as usize]),
            v: Bytes::from(vec![v; (chroma_width * chroma_height) as usize]),
            release: None,
        }
    }

    /// Construct from caller-provided planes.
    ///
    /// The planes are shared, not copied. Dimension and stride consistency
    /// is a hard precondition: violations panic rather than producing a
    /// buffer that would corrupt every downstream stride calculation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_planes(
        width: u32,
        height: u32,
        stride_y: u32,
        y: Bytes,
        stride_u: u32,
        u: Bytes,
        stride_v: u32,
        v: Bytes,
    ) -> Self {
        assert!(
            width > 0 && height > 0,
            "i420 buffer dimensions must be non-zero, got {width}x{height}"
        );
        let chroma_width = (width + 1) / 2;
        let chroma_height = (height + 1) / 2;
        assert!(
            stride_y >= width,
            "stride_y ({stride_y}) must cover width ({width})"
        );
        assert!(
            stride_u >= chroma_width && stride_v >= chroma_width,
            "chroma strides ({stride_u}, {stride_v}) must cover chroma width ({chroma_width})"
        );
        assert!(
            y.len() >= (stride_y * height) as usize,
            "y plane too small: {} bytes for stride {stride_y} x {height} rows",
            y.len()
        );
        assert!(
            u.len() >= (stride_u * chroma_height) as usize,
            "u plane too small: {} bytes for stride {stride_u} x {chroma_height} rows",
            u.len()
        );
        assert!(
            v.len() >= (stride_v * chroma_height) as usize,
            "v plane too small: {} bytes for stride {stride_v} x {chroma_height} rows",
            v.len()
        );
        Self {
            width,
            height,
            stride_y,
            stride_u,
            stride_v,
            y,
            u,
            v,
            release: None,
        }
    }

    /// Wrap externally owned plane memory without copying.
    ///
    /// The returned buffer is a referencing view: the raw memory stays owned
    /// by the caller, and `on_release` is invoked exactly once, when the
    /// last clone of this buffer is dropped. The view must not outlive
    /// whatever validity guarantee backs the callback.
    #[allow(clippy::too_many_arguments)]
    pub fn wrap(
        width: u32,
        height: u32,
        stride_y: u32,
        y: Bytes,
        stride_u: u32,
        u: Bytes,
        stride_v: u32,
        v: Bytes,
        on_release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        let mut buffer = Self::from_planes(width, height, stride_y, y, stride_u, u, stride_v, v);
        buffer.release = Some(ReleaseGuard::new(on_release));
        buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Chroma plane width: `(width + 1) / 2` (ceiling division, so odd luma
    /// widths round up).
    pub fn chroma_width(&self) -> u32 {
        (self.width + 1) / 2
    }

    /// Chroma plane height: `(height + 1) / 2`.
    pub fn chroma_height(&self) -> u32 {
        (self.height + 1) / 2
    }

    pub fn stride_y(&self) -> u32 {
        self.stride_y
    }

    pub fn stride_u(&self) -> u32 {
        self.stride_u
    }

    pub fn stride_v(&self) -> u32 {
        self.stride_v
    }

    pub fn data_y(&self) -> &[u8] {
        &self.y
    }

    pub fn data_u(&self) -> &[u8] {
        &self.u
    }

    pub fn data_v(&self) -> &[u8] {
        &self.v
    }
}

impl std::fmt::Debug for I420Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I420Buffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride_y", &self.stride_y)
            .field("wrapped", &self.release.is_some())
            .finish()
    }
}

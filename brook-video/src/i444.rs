//! I444 (YUV 4:4:4 planar) pixel buffer and its subsampling conversion.

use std::sync::Arc;

use bytes::Bytes;

use crate::i420::I420Buffer;
use crate::release::ReleaseGuard;

/// An I444 planar buffer: Y, U, V planes all at full resolution.
///
/// Same sharing and immutability model as [`I420Buffer`]; the only
/// geometric difference is that chroma dimensions equal the luma
/// dimensions.
#[derive(Clone)]
pub struct I444Buffer {
    width: u32,
    height: u32,
    stride_y: u32,
    stride_u: u32,
    stride_v: u32,
    y: Bytes,
    u: Bytes,
    v: Bytes,
    release: Option<Arc<ReleaseGuard>>,
}

impl I444Buffer {
    /// Allocate a zero-initialised buffer with tightly packed strides.
    pub fn new(width: u32, height: u32) -> Self {
        assert!(
            width > 0 && height > 0,
            "i444 buffer dimensions must be non-zero, got {width}x{height}"
        );
        let plane = vec![0u8; (width * height) as usize];
        Self {
            width,
            height,
            stride_y: width,
            stride_u: width,
            stride_v: width,
            y: Bytes::from(plane.clone()),
            u: Bytes::from(plane.clone()),
            v: Bytes::from(plane),
            release: None,
        }
    }

    /// Construct from caller-provided planes. Preconditions as for
    /// [`I420Buffer::from_planes`], with chroma strides measured against the
    /// full width.
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
            "i444 buffer dimensions must be non-zero, got {width}x{height}"
        );
        assert!(
            stride_y >= width && stride_u >= width && stride_v >= width,
            "strides ({stride_y}, {stride_u}, {stride_v}) must cover width ({width})"
        );
        assert!(
            y.len() >= (stride_y * height) as usize,
            "y plane too small: {} bytes for stride {stride_y} x {height} rows",
            y.len()
        );
        assert!(
            u.len() >= (stride_u * height) as usize,
            "u plane too small: {} bytes for stride {stride_u} x {height} rows",
            u.len()
        );
        assert!(
            v.len() >= (stride_v * height) as usize,
            "v plane too small: {} bytes for stride {stride_v} x {height} rows",
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
    /// Same contract as [`I420Buffer::wrap`]: `on_release` fires exactly
    /// once, at the drop of the last clone.
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

    /// Chroma width equals the luma width (4:4:4 has no subsampling).
    pub fn chroma_width(&self) -> u32 {
        self.width
    }

    /// Chroma height equals the luma height.
    pub fn chroma_height(&self) -> u32 {
        self.height
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

    /// Convert to I420 by 2x2 box-averaging the chroma planes.
    ///
    /// This is a real colorspace conversion producing a new buffer; the luma
    /// plane is repacked and chroma is subsampled with rounding. Rows and
    /// columns past the edge of odd-sized planes are clamped.
    pub fn to_i420(&self) -> I420Buffer {
        let width = self.width as usize;
        let height = self.height as usize;
        let chroma_width = (width + 1) / 2;
        let chroma_height = (height + 1) / 2;

        // Repack luma tightly.
        let mut y = Vec::with_capacity(width * height);
        for row in 0..height {
            let start = row * self.stride_y as usize;
            y.extend_from_slice(&self.y[start..start + width]);
        }

        let subsample = |plane: &[u8], stride: usize| -> Vec<u8> {
            let mut out = Vec::with_capacity(chroma_width * chroma_height);
            for cy in 0..chroma_height {
                let row0 = 2 * cy;
                let row1 = (2 * cy + 1).min(height - 1);
                for cx in 0..chroma_width {
                    let col0 = 2 * cx;
                    let col1 = (2 * cx + 1).min(width - 1);
                    let sum = plane[row0 * stride + col0] as u32
                        + plane[row0 * stride + col1] as u32
                        + plane[row1 * stride + col0] as u32
                        + plane[row1 * stride + col1] as u32;
                    out.push(((sum + 2) / 4) as u8);
                }
            }
            out
        };

        let u = subsample(&self.u, self.stride_u as usize);
        let v = subsample(&self.v, self.stride_v as usize);

        tracing::trace!(
            width = self.width,
            height = self.height,
            "converted i444 buffer to i420"
        );

        I420Buffer::from_planes(
            self.width,
            self.height,
            self.width,
            Bytes::from(y),
            chroma_width as u32,
            Bytes::from(u),
            chroma_width as u32,
            Bytes::from(v),
        )
    }
}

impl std::fmt::Debug for I444Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I444Buffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride_y", &self.stride_y)
            .field("wrapped", &self.release.is_some())
            .finish()
    }
}

//! Encoded video frame envelope and the embedded encoded image.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::audio::CodecError;

/// Whether an encoded frame is independently decodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoFrameKind {
    /// Key frame: self-contained, no reference to prior frames.
    Key,
    /// Delta frame: depends on previously decoded frames.
    Delta,
}

/// Video codec identifier. Opaque to this layer beyond routing/negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodecKind {
    Vp8,
    Vp9,
    H264,
    Av1,
}

/// The encoded bitstream of one frame plus its capture metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// Encoded bitstream for this frame.
    pub data: Bytes,
    /// Encoded width in pixels.
    pub width: u32,
    /// Encoded height in pixels.
    pub height: u32,
    /// Key or delta.
    pub kind: VideoFrameKind,
    /// Capture timestamp in microseconds.
    pub capture_timestamp_us: i64,
}

/// An encoded video frame crossing the transport boundary.
///
/// `referenced_frame_ids` lists the frames this one depends on for decode
/// (layered/SVC references). The ids are stored verbatim; validating that
/// the references are decodable is the receiving decoder's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedVideoFrame {
    /// Identifier of this frame, unique per stream.
    pub frame_id: i64,
    /// Ids of frames this frame references.
    pub referenced_frame_ids: Vec<i64>,
    /// Codec that produced the bitstream.
    pub codec: VideoCodecKind,
    /// The encoded image itself.
    pub image: EncodedImage,
}

impl EncodedVideoFrame {
    /// Whether this frame can be decoded with no prior state.
    pub fn is_key_frame(&self) -> bool {
        self.image.kind == VideoFrameKind::Key
    }
}

/// Serialize an `EncodedVideoFrame` to compact binary via postcard.
pub fn encode_video_frame(frame: &EncodedVideoFrame) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(frame).map_err(CodecError::Serialize)
}

/// Deserialize an `EncodedVideoFrame` from postcard bytes.
pub fn decode_video_frame(data: &[u8]) -> Result<EncodedVideoFrame, CodecError> {
    postcard::from_bytes(data).map_err(CodecError::Deserialize)
}

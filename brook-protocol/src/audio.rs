//! Encoded audio frame envelope: the immutable value a transport carries.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a frame carries speech or a discontinuous-transmission filler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFrameType {
    /// Regular encoded speech.
    Speech,
    /// DTX comfort-noise / silence descriptor frame.
    DiscontinuousTransmission,
}

/// An encoded audio frame crossing the transport boundary.
///
/// Created once by an encoder, moved into a transport send path, consumed
/// once by the receiving sink. The payload is opaque: no codec assumption is
/// made at this layer. `sequence_number` is expected to increase per channel
/// in steady state, but that is the producer's contract — this type only
/// stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAudioFrame {
    /// Sampling rate of the encoded audio in Hz (e.g. 48000).
    pub sampling_rate_hz: u32,
    /// Absolute index of the first sample in this frame within the stream.
    pub starting_sample_index: u64,
    /// Number of samples per channel in this frame.
    pub samples_per_channel: u32,
    /// Monotonic sequence number assigned by the producer.
    pub sequence_number: u32,
    /// Speech or DTX.
    pub frame_type: AudioFrameType,
    /// Negotiated payload type byte identifying the codec.
    pub payload_type: u8,
    /// Opaque encoded data.
    pub payload: Bytes,
}

impl EncodedAudioFrame {
    /// Duration of this frame in milliseconds, derived from sample count.
    pub fn duration_ms(&self) -> u32 {
        if self.sampling_rate_hz == 0 {
            return 0;
        }
        self.samples_per_channel * 1000 / self.sampling_rate_hz
    }
}

/// Errors from envelope encode/decode.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("envelope serialization failed: {0}")]
    Serialize(postcard::Error),
    #[error("envelope deserialization failed: {0}")]
    Deserialize(postcard::Error),
}

/// Serialize an `EncodedAudioFrame` to compact binary via postcard.
pub fn encode_audio_frame(frame: &EncodedAudioFrame) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(frame).map_err(CodecError::Serialize)
}

/// Deserialize an `EncodedAudioFrame` from postcard bytes.
pub fn decode_audio_frame(data: &[u8]) -> Result<EncodedAudioFrame, CodecError> {
    postcard::from_bytes(data).map_err(CodecError::Deserialize)
}

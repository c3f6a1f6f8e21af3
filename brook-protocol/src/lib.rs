//! Shared value types crossing the brook media transport boundary.

pub mod audio;
pub mod data;
pub mod types;
pub mod video;

pub use audio::{AudioFrameType, CodecError, EncodedAudioFrame};
pub use data::{DataMessageType, SendDataParams};
pub use types::ChannelId;
pub use video::{EncodedImage, EncodedVideoFrame, VideoCodecKind, VideoFrameKind};

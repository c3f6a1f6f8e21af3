//! Raw video frame buffers, frame envelopes, and the raw-frame sink trait.

pub mod buffer;
pub mod frame;
pub mod i420;
pub mod i444;
pub mod native;

mod release;

pub use buffer::{VideoBufferType, VideoFrameBuffer};
pub use frame::{VideoFrame, VideoRotation, VideoSink};
pub use i420::I420Buffer;
pub use i444::I444Buffer;
pub use native::{NativeBuffer, NativeHandle};

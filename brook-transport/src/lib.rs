//! The media transport contract and its in-process loopback implementation.

pub mod loopback;
pub mod runner;
pub mod transport;

pub use loopback::{LoopbackStats, LoopbackTransport, MediaTransportPair};
pub use runner::TaskRunner;
pub use transport::{
    AudioFrameSink, DataSink, MediaTransport, MediaTransportError, MediaTransportFactory,
    MediaTransportSettings, MediaTransportState, MediaTransportStateCallback, VideoFrameSink,
};

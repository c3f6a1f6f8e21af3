//! The abstract media transport contract.
//!
//! Every concrete transport, wire-based or the in-process
//! [`LoopbackTransport`](crate::loopback::LoopbackTransport) test double,
//! implements [`MediaTransport`], so session code stays transport-agnostic.
//!
//! All send-side methods are fire-and-forget: they enqueue delivery and
//! return without waiting, reporting only locally-detectable failure.
//! Network-level failure is never visible through a send call; it arrives
//! asynchronously as a state transition on the registered state callback.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use brook_protocol::{ChannelId, EncodedAudioFrame, EncodedVideoFrame, SendDataParams};

/// Connection state of a transport, driven by the implementation and
/// delivered to the registered state callback exactly once per transition,
/// in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTransportState {
    /// Created, negotiation not started.
    Pending,
    /// Negotiation/handshake in progress.
    Connecting,
    /// Connected and writable.
    Writable,
    /// Torn down; sends fail locally from here on.
    Closed,
}

/// Receives encoded audio frames delivered by a transport.
pub trait AudioFrameSink: Send + Sync {
    /// Frame ownership transfers to the sink.
    fn on_frame(&self, channel_id: ChannelId, frame: EncodedAudioFrame);
}

/// Receives encoded video frames delivered by a transport.
pub trait VideoFrameSink: Send + Sync {
    /// The sink clones the frame if it needs to retain it (cheap: the
    /// payload is refcounted).
    fn on_frame(&self, channel_id: ChannelId, frame: &EncodedVideoFrame);
}

/// Receives data-channel messages and channel lifecycle notifications.
pub trait DataSink: Send + Sync {
    fn on_data(&self, channel_id: ChannelId, data: Bytes);

    /// The remote side requested the channel be closed; no further sends
    /// should be made on it.
    fn on_channel_closing(&self, channel_id: ChannelId);

    /// The channel is fully closed.
    fn on_channel_closed(&self, channel_id: ChannelId);
}

/// Observes transport state transitions.
pub trait MediaTransportStateCallback: Send + Sync {
    fn on_state_changed(&self, state: MediaTransportState);
}

/// Local, synchronously detectable transport failures.
///
/// This is the complete failure surface of a send call: remote or network
/// failure is not representable here by contract.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MediaTransportError {
    #[error("transport is closed")]
    Closed,
    #[error("not supported by this transport: {0}")]
    Unsupported(&'static str),
}

/// The polymorphic transport seam.
///
/// # Send semantics
///
/// `send_*` and `close_channel` enqueue and return immediately. An `Err` is
/// only returned for local failure (e.g. the transport is closed).
///
/// # Sink registration
///
/// At most one sink of each kind may be registered. Registering a sink
/// while one is already present is a contract violation and panics; pass
/// `None` first. Every sink must be unregistered before the transport is
/// dropped. Implementations enforce this fatally, because a pending
/// asynchronous delivery must never race a destroyed sink.
pub trait MediaTransport: Send + Sync {
    /// Send an encoded audio frame. Takes ownership of the frame.
    fn send_audio_frame(
        &self,
        channel_id: ChannelId,
        frame: EncodedAudioFrame,
    ) -> Result<(), MediaTransportError>;

    /// Send an encoded video frame. The transport clones what it needs to
    /// retain before returning, so the caller keeps ownership.
    fn send_video_frame(
        &self,
        channel_id: ChannelId,
        frame: &EncodedVideoFrame,
    ) -> Result<(), MediaTransportError>;

    /// Ask the remote encoder for a key frame. Delivery timing is not
    /// guaranteed.
    fn request_key_frame(&self, channel_id: ChannelId) -> Result<(), MediaTransportError>;

    /// Register (Some) or unregister (None) the audio receive sink.
    fn set_receive_audio_sink(&self, sink: Option<Arc<dyn AudioFrameSink>>);

    /// Register (Some) or unregister (None) the video receive sink.
    fn set_receive_video_sink(&self, sink: Option<Arc<dyn VideoFrameSink>>);

    /// Register (Some) or unregister (None) the data-channel sink.
    fn set_data_sink(&self, sink: Option<Arc<dyn DataSink>>);

    /// Register (Some) or unregister (None) the state callback.
    ///
    /// Registration immediately re-dispatches the current state to the new
    /// callback, asynchronously, so a late observer still converges on the
    /// present state before seeing future transitions.
    fn set_state_callback(&self, callback: Option<Arc<dyn MediaTransportStateCallback>>);

    /// Send a data-channel message.
    fn send_data(
        &self,
        channel_id: ChannelId,
        params: &SendDataParams,
        data: Bytes,
    ) -> Result<(), MediaTransportError>;

    /// Close a data channel. The remote sink is notified asynchronously.
    fn close_channel(&self, channel_id: ChannelId) -> Result<(), MediaTransportError>;
}

/// Settings handed to a factory at session-setup time.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaTransportSettings {
    /// Whether this side initiated the session (offerer).
    pub is_caller: bool,
}

/// Creates transports at session-setup time.
///
/// The seam session code depends on; which concrete factory is injected
/// decides whether a session runs over a wire transport or a test double.
pub trait MediaTransportFactory: Send + Sync {
    fn create_transport(
        &self,
        settings: &MediaTransportSettings,
    ) -> Result<Arc<dyn MediaTransport>, MediaTransportError>;
}

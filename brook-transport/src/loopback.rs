//! In-process loopback transport pair.
//!
//! Two [`MediaTransport`] endpoints wired to each other through one
//! [`TaskRunner`], proving the contract is implementable and giving higher
//! layers something deterministic to run against without real networking.
//! Every send enqueues an asynchronous delivery to the peer's registered
//! sink; [`MediaTransportPair::flush`] drains the queue so tests can make
//! assertions deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

use brook_protocol::{ChannelId, EncodedAudioFrame, EncodedVideoFrame, SendDataParams};

use crate::runner::{TaskRunner, TaskRunnerHandle};
use crate::transport::{
    AudioFrameSink, DataSink, MediaTransport, MediaTransportError, MediaTransportState,
    MediaTransportStateCallback, VideoFrameSink,
};

/// Cumulative per-endpoint counters.
///
/// Plain atomics, so a sink callback (which runs while the delivery path
/// holds the sink registration lock) can read them without taking any lock
/// at all.
pub struct LoopbackStats {
    pub sent_audio_frames: AtomicU64,
    pub received_audio_frames: AtomicU64,
    pub sent_video_frames: AtomicU64,
    pub received_video_frames: AtomicU64,
    pub sent_data_messages: AtomicU64,
    pub received_data_messages: AtomicU64,
}

impl LoopbackStats {
    fn new() -> Self {
        Self {
            sent_audio_frames: AtomicU64::new(0),
            received_audio_frames: AtomicU64::new(0),
            sent_video_frames: AtomicU64::new(0),
            received_video_frames: AtomicU64::new(0),
            sent_data_messages: AtomicU64::new(0),
            received_data_messages: AtomicU64::new(0),
        }
    }
}

#[derive(Default)]
struct SinkRegistry {
    audio: Option<Arc<dyn AudioFrameSink>>,
    video: Option<Arc<dyn VideoFrameSink>>,
    data: Option<Arc<dyn DataSink>>,
    state_callback: Option<Arc<dyn MediaTransportStateCallback>>,
}

impl SinkRegistry {
    fn is_empty(&self) -> bool {
        self.audio.is_none()
            && self.video.is_none()
            && self.data.is_none()
            && self.state_callback.is_none()
    }
}

/// Per-endpoint state shared with in-flight delivery tasks.
///
/// Delivery tasks hold an `Arc` to this, never to the transport itself, so
/// a task that is already past the point of no return stays valid even if
/// the transport object is gone.
struct Shared {
    label: &'static str,
    sinks: Mutex<SinkRegistry>,
    stats: Arc<LoopbackStats>,
    state: Mutex<MediaTransportState>,
}

impl Shared {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            sinks: Mutex::new(SinkRegistry::default()),
            stats: Arc::new(LoopbackStats::new()),
            state: Mutex::new(MediaTransportState::Pending),
        }
    }

    fn sinks(&self) -> MutexGuard<'_, SinkRegistry> {
        self.sinks.lock().expect("sink registry lock poisoned")
    }

    fn state(&self) -> MediaTransportState {
        *self.state.lock().expect("state lock poisoned")
    }
}

/// One endpoint of a [`MediaTransportPair`].
///
/// Sends are fire-and-forget: they enqueue a delivery task on the pair's
/// dispatch worker and return. Dropping the transport while any sink is
/// still registered is a fatal contract violation; unregister first, so a
/// pending delivery can never race a destroyed sink.
pub struct LoopbackTransport {
    local: Arc<Shared>,
    remote: Arc<Shared>,
    tasks: TaskRunnerHandle,
}

impl LoopbackTransport {
    fn check_open(&self) -> Result<(), MediaTransportError> {
        if self.local.state() == MediaTransportState::Closed {
            return Err(MediaTransportError::Closed);
        }
        Ok(())
    }

    fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<(), MediaTransportError> {
        if self.tasks.post(task) {
            Ok(())
        } else {
            // The pair (and its dispatch worker) is gone; treat like a
            // closed transport.
            Err(MediaTransportError::Closed)
        }
    }

    /// This endpoint's cumulative counters.
    pub fn stats(&self) -> &Arc<LoopbackStats> {
        &self.local.stats
    }

    /// Drive a state transition, notifying the registered callback
    /// asynchronously, in order, exactly once per transition.
    pub fn set_state(&self, state: MediaTransportState) {
        *self.local.state.lock().expect("state lock poisoned") = state;
        tracing::debug!(endpoint = self.local.label, ?state, "transport state changed");

        let local = Arc::clone(&self.local);
        let _ = self.tasks.post(move || {
            let sinks = local.sinks();
            if let Some(callback) = sinks.state_callback.as_ref() {
                callback.on_state_changed(state);
            }
        });
    }
}

impl MediaTransport for LoopbackTransport {
    fn send_audio_frame(
        &self,
        channel_id: ChannelId,
        frame: EncodedAudioFrame,
    ) -> Result<(), MediaTransportError> {
        self.check_open()?;

        let remote = Arc::clone(&self.remote);
        self.post(move || {
            {
                let sinks = remote.sinks();
                if let Some(sink) = sinks.audio.as_ref() {
                    sink.on_frame(channel_id, frame);
                }
            }
            remote.stats.received_audio_frames.fetch_add(1, Ordering::Relaxed);
        })?;

        self.local.stats.sent_audio_frames.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(endpoint = self.local.label, %channel_id, "queued audio frame");
        Ok(())
    }

    fn send_video_frame(
        &self,
        channel_id: ChannelId,
        frame: &EncodedVideoFrame,
    ) -> Result<(), MediaTransportError> {
        self.check_open()?;

        // Retain before the thread hop: the caller's frame may be gone by
        // the time the delivery task runs. The clone is cheap (refcounted
        // payload), but it is what keeps the backing memory alive.
        let frame = frame.clone();
        let remote = Arc::clone(&self.remote);
        self.post(move || {
            {
                let sinks = remote.sinks();
                if let Some(sink) = sinks.video.as_ref() {
                    sink.on_frame(channel_id, &frame);
                }
            }
            remote.stats.received_video_frames.fetch_add(1, Ordering::Relaxed);
        })?;

        self.local.stats.sent_video_frames.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(endpoint = self.local.label, %channel_id, "queued video frame");
        Ok(())
    }

    fn request_key_frame(&self, channel_id: ChannelId) -> Result<(), MediaTransportError> {
        self.check_open()?;
        // No remote encoder exists in a loopback; succeed without doing
        // anything. Real transports forward this to the peer.
        tracing::trace!(endpoint = self.local.label, %channel_id, "key frame request ignored");
        Ok(())
    }

    fn set_receive_audio_sink(&self, sink: Option<Arc<dyn AudioFrameSink>>) {
        let mut sinks = self.local.sinks();
        if let Some(sink) = sink {
            assert!(
                sinks.audio.is_none(),
                "audio sink already registered, unregister with None first"
            );
            sinks.audio = Some(sink);
        } else {
            sinks.audio = None;
        }
    }

    fn set_receive_video_sink(&self, sink: Option<Arc<dyn VideoFrameSink>>) {
        let mut sinks = self.local.sinks();
        if let Some(sink) = sink {
            assert!(
                sinks.video.is_none(),
                "video sink already registered, unregister with None first"
            );
            sinks.video = Some(sink);
        } else {
            sinks.video = None;
        }
    }

    fn set_data_sink(&self, sink: Option<Arc<dyn DataSink>>) {
        let mut sinks = self.local.sinks();
        if let Some(sink) = sink {
            assert!(
                sinks.data.is_none(),
                "data sink already registered, unregister with None first"
            );
            sinks.data = Some(sink);
        } else {
            sinks.data = None;
        }
    }

    fn set_state_callback(&self, callback: Option<Arc<dyn MediaTransportStateCallback>>) {
        match callback {
            Some(callback) => {
                {
                    let mut sinks = self.local.sinks();
                    assert!(
                        sinks.state_callback.is_none(),
                        "state callback already registered, unregister with None first"
                    );
                    sinks.state_callback = Some(callback);
                }
                // Re-dispatch the state as of registration time, so a late
                // observer converges before seeing future transitions.
                let state = self.local.state();
                let local = Arc::clone(&self.local);
                let _ = self.tasks.post(move || {
                    let sinks = local.sinks();
                    if let Some(callback) = sinks.state_callback.as_ref() {
                        callback.on_state_changed(state);
                    }
                });
            }
            None => self.local.sinks().state_callback = None,
        }
    }

    fn send_data(
        &self,
        channel_id: ChannelId,
        params: &SendDataParams,
        data: Bytes,
    ) -> Result<(), MediaTransportError> {
        self.check_open()?;

        tracing::trace!(
            endpoint = self.local.label,
            %channel_id,
            ordered = params.ordered,
            reliable = params.reliable,
            bytes = data.len(),
            "queued data message"
        );

        let remote = Arc::clone(&self.remote);
        self.post(move || {
            {
                let sinks = remote.sinks();
                if let Some(sink) = sinks.data.as_ref() {
                    sink.on_data(channel_id, data);
                }
            }
            remote.stats.received_data_messages.fetch_add(1, Ordering::Relaxed);
        })?;

        self.local.stats.sent_data_messages.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close_channel(&self, channel_id: ChannelId) -> Result<(), MediaTransportError> {
        self.check_open()?;

        let remote = Arc::clone(&self.remote);
        self.post(move || {
            let sinks = remote.sinks();
            if let Some(sink) = sinks.data.as_ref() {
                sink.on_channel_closing(channel_id);
                sink.on_channel_closed(channel_id);
            }
        })?;

        tracing::debug!(endpoint = self.local.label, %channel_id, "queued channel close");
        Ok(())
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        // Keep the original panic readable when unwinding already started.
        if std::thread::panicking() {
            return;
        }
        // Orderly teardown is the caller's job: a sink that is still
        // registered here could be referenced by a pending delivery task.
        let sinks = self.local.sinks();
        assert!(
            sinks.is_empty(),
            "loopback transport '{}' dropped with sinks still registered",
            self.local.label
        );
    }
}

/// Two loopback transports delivering to each other through one dispatch
/// worker.
///
/// Dropping the pair cancels queued, not-yet-run deliveries; call
/// [`flush`](Self::flush) first when delivery must be observed.
pub struct MediaTransportPair {
    first: Arc<LoopbackTransport>,
    second: Arc<LoopbackTransport>,
    runner: TaskRunner,
}

impl MediaTransportPair {
    /// Create a wired pair. Must be called within a tokio runtime (the
    /// dispatch worker is spawned on it).
    pub fn new() -> Self {
        let runner = TaskRunner::new();
        let first_shared = Arc::new(Shared::new("first"));
        let second_shared = Arc::new(Shared::new("second"));

        let first = Arc::new(LoopbackTransport {
            local: Arc::clone(&first_shared),
            remote: Arc::clone(&second_shared),
            tasks: runner.handle(),
        });
        let second = Arc::new(LoopbackTransport {
            local: second_shared,
            remote: first_shared,
            tasks: runner.handle(),
        });

        tracing::info!("loopback media transport pair created");
        Self {
            first,
            second,
            runner,
        }
    }

    pub fn first(&self) -> &Arc<LoopbackTransport> {
        &self.first
    }

    pub fn second(&self) -> &Arc<LoopbackTransport> {
        &self.second
    }

    /// Drive both endpoints through a state transition.
    pub fn set_state(&self, state: MediaTransportState) {
        self.first.set_state(state);
        self.second.set_state(state);
    }

    /// Synchronously drain all pending deliveries, making prior sends
    /// observable.
    pub async fn flush(&self) {
        self.runner.flush().await;
    }
}

impl Default for MediaTransportPair {
    fn default() -> Self {
        Self::new()
    }
}

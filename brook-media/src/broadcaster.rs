//! One-to-many raw frame fan-out with constraint aggregation.

use std::sync::{Arc, Mutex, MutexGuard};

use brook_video::{I420Buffer, VideoFrame, VideoFrameBuffer, VideoSink};

use crate::wants::VideoSinkWants;

struct SinkEntry {
    sink: Arc<dyn VideoSink>,
    wants: VideoSinkWants,
}

struct Inner {
    sinks: Vec<SinkEntry>,
    /// Aggregate of all registered sinks' wants, recomputed eagerly on
    /// every add/update/remove.
    wants: VideoSinkWants,
    /// Cached black frame, regenerated only when dimensions or rotation
    /// change.
    black_frame: Option<VideoFrame>,
}

/// Fans one upstream frame source out to any number of sinks, while
/// aggregating their individual [`VideoSinkWants`] into a single upstream
/// request.
///
/// Sinks are identified by `Arc` pointer identity and held as shared
/// references, but registration is the caller's responsibility end to end:
/// a sink must be removed before its owner retires it.
///
/// Delivery holds the registry lock for the full fan-out, so sinks receive
/// every frame in registration order and a slow sink delays the rest —
/// strict sequential delivery is preferred over partial-failure isolation.
/// A consequence: a sink callback must not call
/// [`add_or_update_sink`](Self::add_or_update_sink) or
/// [`remove_sink`](Self::remove_sink) on the broadcaster delivering to it.
pub struct VideoBroadcaster {
    inner: Mutex<Inner>,
}

impl VideoBroadcaster {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sinks: Vec::new(),
                wants: VideoSinkWants::default(),
                black_frame: None,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("broadcaster lock poisoned")
    }

    /// Register a sink, or update the wants of an already-registered one.
    pub fn add_or_update_sink(&self, sink: Arc<dyn VideoSink>, wants: VideoSinkWants) {
        let mut inner = self.inner();
        let wants = wants.normalized();
        match inner
            .sinks
            .iter_mut()
            .find(|entry| Arc::ptr_eq(&entry.sink, &sink))
        {
            Some(entry) => {
                entry.wants = wants;
                tracing::debug!("updated sink wants");
            }
            None => {
                inner.sinks.push(SinkEntry { sink, wants });
                tracing::debug!(sink_count = inner.sinks.len(), "sink added");
            }
        }
        Self::recompute_wants(&mut inner);
    }

    /// Unregister a sink. Removing a sink that was never registered is a
    /// no-op, which keeps caller teardown idempotent.
    pub fn remove_sink(&self, sink: &Arc<dyn VideoSink>) {
        let mut inner = self.inner();
        inner.sinks.retain(|entry| !Arc::ptr_eq(&entry.sink, sink));
        tracing::debug!(sink_count = inner.sinks.len(), "sink removed");
        Self::recompute_wants(&mut inner);
    }

    /// Whether producing frames is worthwhile at all: true iff at least one
    /// sink is registered. Sources use this to skip capture/decode work.
    pub fn frame_wanted(&self) -> bool {
        !self.inner().sinks.is_empty()
    }

    /// The current aggregate of all sinks' wants.
    pub fn wants(&self) -> VideoSinkWants {
        self.inner().wants
    }

    fn recompute_wants(inner: &mut Inner) {
        let mut wants = VideoSinkWants::default();
        for entry in &inner.sinks {
            // If any sink needs pre-rotated frames the source must rotate:
            // there is only one upstream frame for everyone.
            wants.rotation_applied |= entry.wants.rotation_applied;
            // Most restrictive resolution wins.
            wants.max_pixel_count = opt_min(wants.max_pixel_count, entry.wants.max_pixel_count);
            wants.max_pixel_count_step_up = opt_min(
                wants.max_pixel_count_step_up,
                entry.wants.max_pixel_count_step_up,
            );
        }
        inner.wants = wants.normalized();
    }

    /// Get the black frame to substitute for `frame`, regenerating the
    /// cached buffer only when dimensions or rotation changed.
    fn black_frame_for(cache: &mut Option<VideoFrame>, frame: &VideoFrame) -> VideoFrame {
        let buffer = match cache {
            Some(cached)
                if cached.width() == frame.width()
                    && cached.height() == frame.height()
                    && cached.rotation() == frame.rotation() =>
            {
                Arc::clone(cached.buffer())
            }
            _ => {
                tracing::debug!(
                    width = frame.width(),
                    height = frame.height(),
                    rotation = frame.rotation().degrees(),
                    "regenerating cached black frame"
                );
                let buffer = Arc::new(VideoFrameBuffer::from(I420Buffer::black(
                    frame.width(),
                    frame.height(),
                )));
                *cache = Some(VideoFrame::new(
                    Arc::clone(&buffer),
                    frame.rotation(),
                    frame.timestamp_us(),
                ));
                buffer
            }
        };
        // The substitute carries the real frame's timestamp so downstream
        // timing is undisturbed.
        VideoFrame::new(buffer, frame.rotation(), frame.timestamp_us())
    }
}

impl Default for VideoBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSink for VideoBroadcaster {
    fn on_frame(&self, frame: &VideoFrame) {
        let mut inner = self.inner();
        let Inner {
            sinks, black_frame, ..
        } = &mut *inner;
        for entry in sinks.iter() {
            if entry.wants.black_frames {
                let substitute = Self::black_frame_for(black_frame, frame);
                entry.sink.on_frame(&substitute);
            } else {
                entry.sink.on_frame(frame);
            }
        }
    }
}

fn opt_min(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (value, None) | (None, value) => value,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use brook_video::VideoRotation;

    use super::*;

    #[derive(Default)]
    struct CountingSink {
        frames: AtomicU64,
        last_y: Mutex<Option<u8>>,
        last_timestamp_us: AtomicU64,
    }

    impl VideoSink for CountingSink {
        fn on_frame(&self, frame: &VideoFrame) {
            self.frames.fetch_add(1, Ordering::Relaxed);
            *self.last_y.lock().expect("last_y lock") =
                Some(frame.buffer().to_i420().data_y()[0]);
            self.last_timestamp_us
                .store(frame.timestamp_us() as u64, Ordering::Relaxed);
        }
    }

    fn gray_frame(width: u32, height: u32, timestamp_us: i64) -> VideoFrame {
        // Zero-initialised planes: Y=0, distinguishable from black's Y=16.
        let buffer = Arc::new(VideoFrameBuffer::from(I420Buffer::new(width, height)));
        VideoFrame::new(buffer, VideoRotation::Deg0, timestamp_us)
    }

    fn as_sink(sink: &Arc<CountingSink>) -> Arc<dyn VideoSink> {
        Arc::clone(sink) as Arc<dyn VideoSink>
    }

    #[test]
    fn frame_wanted_toggles_with_registration() {
        let broadcaster = VideoBroadcaster::new();
        assert!(!broadcaster.frame_wanted());

        let sink = Arc::new(CountingSink::default());
        broadcaster.add_or_update_sink(as_sink(&sink), VideoSinkWants::default());
        assert!(broadcaster.frame_wanted());

        broadcaster.remove_sink(&as_sink(&sink));
        assert!(!broadcaster.frame_wanted());
    }

    #[test]
    fn every_sink_receives_every_frame() {
        let broadcaster = VideoBroadcaster::new();
        let a = Arc::new(CountingSink::default());
        let b = Arc::new(CountingSink::default());
        broadcaster.add_or_update_sink(as_sink(&a), VideoSinkWants::default());
        broadcaster.add_or_update_sink(as_sink(&b), VideoSinkWants::default());

        broadcaster.on_frame(&gray_frame(64, 48, 1000));
        assert_eq!(a.frames.load(Ordering::Relaxed), 1);
        assert_eq!(b.frames.load(Ordering::Relaxed), 1);

        broadcaster.remove_sink(&as_sink(&a));
        broadcaster.on_frame(&gray_frame(64, 48, 2000));
        assert_eq!(a.frames.load(Ordering::Relaxed), 1);
        assert_eq!(b.frames.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn max_pixel_count_aggregates_to_minimum() {
        let broadcaster = VideoBroadcaster::new();
        let hd = Arc::new(CountingSink::default());
        let sd = Arc::new(CountingSink::default());

        broadcaster.add_or_update_sink(
            as_sink(&hd),
            VideoSinkWants {
                max_pixel_count: Some(1280 * 720),
                ..Default::default()
            },
        );
        broadcaster.add_or_update_sink(
            as_sink(&sd),
            VideoSinkWants {
                max_pixel_count: Some(640 * 360),
                ..Default::default()
            },
        );
        assert_eq!(broadcaster.wants().max_pixel_count, Some(640 * 360));

        broadcaster.remove_sink(&as_sink(&sd));
        assert_eq!(broadcaster.wants().max_pixel_count, Some(1280 * 720));

        broadcaster.remove_sink(&as_sink(&hd));
        assert_eq!(broadcaster.wants().max_pixel_count, None);
    }

    #[test]
    fn rotation_applied_aggregates_by_or() {
        let broadcaster = VideoBroadcaster::new();
        let flexible = Arc::new(CountingSink::default());
        let rigid = Arc::new(CountingSink::default());

        broadcaster.add_or_update_sink(as_sink(&flexible), VideoSinkWants::default());
        assert!(!broadcaster.wants().rotation_applied);

        broadcaster.add_or_update_sink(
            as_sink(&rigid),
            VideoSinkWants {
                rotation_applied: true,
                ..Default::default()
            },
        );
        assert!(broadcaster.wants().rotation_applied);

        broadcaster.remove_sink(&as_sink(&rigid));
        assert!(!broadcaster.wants().rotation_applied);

        broadcaster.remove_sink(&as_sink(&flexible));
    }

    #[test]
    fn contradictory_step_up_is_cleared_in_aggregate() {
        let broadcaster = VideoBroadcaster::new();
        let sink = Arc::new(CountingSink::default());
        broadcaster.add_or_update_sink(
            as_sink(&sink),
            VideoSinkWants {
                max_pixel_count: Some(640 * 360),
                max_pixel_count_step_up: Some(1280 * 720),
                ..Default::default()
            },
        );

        let wants = broadcaster.wants();
        assert_eq!(wants.max_pixel_count, Some(640 * 360));
        assert!(wants.max_pixel_count_step_up.is_none());

        broadcaster.remove_sink(&as_sink(&sink));
    }

    #[test]
    fn step_up_aggregates_to_minimum_when_consistent() {
        let broadcaster = VideoBroadcaster::new();
        let a = Arc::new(CountingSink::default());
        let b = Arc::new(CountingSink::default());

        broadcaster.add_or_update_sink(
            as_sink(&a),
            VideoSinkWants {
                max_pixel_count: Some(1280 * 720),
                max_pixel_count_step_up: Some(960 * 540),
                ..Default::default()
            },
        );
        broadcaster.add_or_update_sink(
            as_sink(&b),
            VideoSinkWants {
                max_pixel_count: Some(1280 * 720),
                max_pixel_count_step_up: Some(640 * 360),
                ..Default::default()
            },
        );
        assert_eq!(broadcaster.wants().max_pixel_count_step_up, Some(640 * 360));

        broadcaster.remove_sink(&as_sink(&a));
        broadcaster.remove_sink(&as_sink(&b));
    }

    #[test]
    fn update_replaces_wants_instead_of_duplicating_sink() {
        let broadcaster = VideoBroadcaster::new();
        let sink = Arc::new(CountingSink::default());

        broadcaster.add_or_update_sink(
            as_sink(&sink),
            VideoSinkWants {
                max_pixel_count: Some(1280 * 720),
                ..Default::default()
            },
        );
        broadcaster.add_or_update_sink(
            as_sink(&sink),
            VideoSinkWants {
                max_pixel_count: Some(640 * 360),
                ..Default::default()
            },
        );
        assert_eq!(broadcaster.wants().max_pixel_count, Some(640 * 360));

        broadcaster.on_frame(&gray_frame(64, 48, 0));
        assert_eq!(sink.frames.load(Ordering::Relaxed), 1, "one entry, one delivery");

        broadcaster.remove_sink(&as_sink(&sink));
    }

    #[test]
    fn remove_unknown_sink_is_noop() {
        let broadcaster = VideoBroadcaster::new();
        let registered = Arc::new(CountingSink::default());
        let stranger = Arc::new(CountingSink::default());

        broadcaster.add_or_update_sink(as_sink(&registered), VideoSinkWants::default());
        broadcaster.remove_sink(&as_sink(&stranger));
        assert!(broadcaster.frame_wanted());

        broadcaster.remove_sink(&as_sink(&registered));
    }

    #[test]
    fn black_frame_sink_gets_black_pixels_and_real_timestamp() {
        let broadcaster = VideoBroadcaster::new();
        let normal = Arc::new(CountingSink::default());
        let private = Arc::new(CountingSink::default());

        broadcaster.add_or_update_sink(as_sink(&normal), VideoSinkWants::default());
        broadcaster.add_or_update_sink(
            as_sink(&private),
            VideoSinkWants {
                black_frames: true,
                ..Default::default()
            },
        );

        broadcaster.on_frame(&gray_frame(64, 48, 7_000));

        assert_eq!(*normal.last_y.lock().expect("last_y lock"), Some(0));
        assert_eq!(*private.last_y.lock().expect("last_y lock"), Some(16));
        assert_eq!(private.last_timestamp_us.load(Ordering::Relaxed), 7_000);

        broadcaster.remove_sink(&as_sink(&normal));
        broadcaster.remove_sink(&as_sink(&private));
    }

    /// A sink that records the buffer address it saw, to observe caching.
    #[derive(Default)]
    struct BufferIdentitySink {
        seen: Mutex<Vec<usize>>,
    }

    impl VideoSink for BufferIdentitySink {
        fn on_frame(&self, frame: &VideoFrame) {
            self.seen
                .lock()
                .expect("seen lock")
                .push(Arc::as_ptr(frame.buffer()) as *const () as usize);
        }
    }

    #[test]
    fn black_frame_cache_regenerates_only_on_dimension_change() {
        let broadcaster = VideoBroadcaster::new();
        let sink = Arc::new(BufferIdentitySink::default());
        broadcaster.add_or_update_sink(
            Arc::clone(&sink) as Arc<dyn VideoSink>,
            VideoSinkWants {
                black_frames: true,
                ..Default::default()
            },
        );

        broadcaster.on_frame(&gray_frame(64, 48, 0));
        broadcaster.on_frame(&gray_frame(64, 48, 1));
        broadcaster.on_frame(&gray_frame(32, 24, 2));
        broadcaster.on_frame(&gray_frame(32, 24, 3));

        let seen = sink.seen.lock().expect("seen lock");
        assert_eq!(seen[0], seen[1], "same dimensions reuse the cached buffer");
        assert_ne!(seen[1], seen[2], "dimension change regenerates");
        assert_eq!(seen[2], seen[3]);
        drop(seen);

        broadcaster.remove_sink(&(Arc::clone(&sink) as Arc<dyn VideoSink>));
    }

    #[test]
    fn black_frame_cache_regenerates_on_rotation_change() {
        let broadcaster = VideoBroadcaster::new();
        let sink = Arc::new(BufferIdentitySink::default());
        broadcaster.add_or_update_sink(
            Arc::clone(&sink) as Arc<dyn VideoSink>,
            VideoSinkWants {
                black_frames: true,
                ..Default::default()
            },
        );

        let buffer = Arc::new(VideoFrameBuffer::from(I420Buffer::new(64, 48)));
        broadcaster.on_frame(&VideoFrame::new(Arc::clone(&buffer), VideoRotation::Deg0, 0));
        broadcaster.on_frame(&VideoFrame::new(buffer, VideoRotation::Deg90, 1));

        let seen = sink.seen.lock().expect("seen lock");
        assert_ne!(seen[0], seen[1], "rotation change regenerates");
        drop(seen);

        broadcaster.remove_sink(&(Arc::clone(&sink) as Arc<dyn VideoSink>));
    }
}

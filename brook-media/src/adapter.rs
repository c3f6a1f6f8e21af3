//! Capturer-side resolution and frame-rate adaptation.

use crate::wants::VideoSinkWants;

/// Adapts captured frames to the downstream constraint before encode.
///
/// A source runs every frame through [`adapt_frame`](Self::adapt_frame):
/// the answer is either "drop it" (frame-rate policing) or the resolution
/// to scale to before handing the frame on. Scaling steps multiply both
/// dimensions by 3/4 (keeping them even) until the pixel count fits the
/// cap, which preserves aspect ratio and keeps step sizes encoder-friendly.
///
/// Owned by the capture path; not shared, hence `&mut self`.
#[derive(Debug, Default)]
pub struct VideoAdapter {
    max_pixel_count: Option<u32>,
    max_framerate_fps: Option<u32>,
    /// Timestamp before which frames are dropped to honour the fps cap.
    next_frame_due_us: Option<i64>,
    frames_in: u64,
    frames_out: u64,
    frames_dropped: u64,
    frames_scaled: u64,
}

impl VideoAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the resolution constraint from an aggregated wants record.
    pub fn on_sink_wants(&mut self, wants: &VideoSinkWants) {
        if self.max_pixel_count != wants.max_pixel_count {
            tracing::debug!(max_pixel_count = ?wants.max_pixel_count, "resolution request changed");
        }
        self.max_pixel_count = wants.max_pixel_count;
    }

    /// Cap the output frame rate; `None` lifts the cap.
    pub fn set_max_framerate(&mut self, fps: Option<u32>) {
        self.max_framerate_fps = fps;
        self.next_frame_due_us = None;
    }

    /// Decide what to do with a captured frame.
    ///
    /// Returns `None` when the frame should be dropped to honour the frame
    /// rate cap, otherwise the dimensions to scale it to (which equal the
    /// input when no resolution constraint applies).
    pub fn adapt_frame(
        &mut self,
        width: u32,
        height: u32,
        timestamp_us: i64,
    ) -> Option<(u32, u32)> {
        self.frames_in += 1;

        if let Some(fps) = self.max_framerate_fps {
            if fps == 0 {
                self.frames_dropped += 1;
                return None;
            }
            let interval_us = 1_000_000 / fps as i64;
            match self.next_frame_due_us {
                Some(due) if timestamp_us < due => {
                    self.frames_dropped += 1;
                    tracing::trace!(timestamp_us, due, "dropped frame for fps cap");
                    return None;
                }
                _ => self.next_frame_due_us = Some(timestamp_us + interval_us),
            }
        }

        let (out_width, out_height) = self.target_dimensions(width, height);
        if (out_width, out_height) != (width, height) {
            self.frames_scaled += 1;
        }
        self.frames_out += 1;
        Some((out_width, out_height))
    }

    fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let Some(cap) = self.max_pixel_count else {
            return (width, height);
        };
        let mut out_width = width as u64;
        let mut out_height = height as u64;
        while out_width * out_height > cap as u64 && (out_width > 2 || out_height > 2) {
            out_width = round_even(out_width * 3 / 4);
            out_height = round_even(out_height * 3 / 4);
        }
        (out_width as u32, out_height as u32)
    }

    pub fn frames_in(&self) -> u64 {
        self.frames_in
    }

    pub fn frames_out(&self) -> u64 {
        self.frames_out
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    pub fn frames_scaled(&self) -> u64 {
        self.frames_scaled
    }
}

/// Round down to an even pixel count, with a floor of 2 so chroma planes
/// never collapse.
fn round_even(value: u64) -> u64 {
    (value & !1).max(2)
}

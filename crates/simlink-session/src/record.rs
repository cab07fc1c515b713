use std::time::{Duration, Instant};

use simlink_display::PixelBuffer;
use tracing::debug;

/// Shortest delay stored for a recorded frame.
pub const MIN_FRAME_DELAY: Duration = Duration::from_millis(20);

// Delay credited to the frame on screen when recording starts.
const INITIAL_FRAME_DELAY: Duration = Duration::from_millis(100);

/// One captured display state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    /// Time since the previous frame, floored at [`MIN_FRAME_DELAY`].
    pub delay: Duration,
    pub pixels: PixelBuffer,
}

/// Accumulates frames while a recording is active.
#[derive(Debug)]
pub struct Recorder {
    frames: Vec<RecordedFrame>,
    last: Instant,
}

impl Recorder {
    /// Begin recording with the display as it is right now.
    pub fn start(current: &PixelBuffer, now: Instant) -> Self {
        let mut recorder = Self {
            frames: Vec::new(),
            last: now.checked_sub(INITIAL_FRAME_DELAY).unwrap_or(now),
        };
        recorder.capture(current, now);
        recorder
    }

    /// Append a frame decoded at `now`.
    pub fn capture(&mut self, pixels: &PixelBuffer, now: Instant) {
        let delay = now.saturating_duration_since(self.last).max(MIN_FRAME_DELAY);
        self.last = now;
        self.frames.push(RecordedFrame {
            delay,
            pixels: pixels.clone(),
        });
        debug!(frames = self.frames.len(), ?delay, "captured frame");
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn finish(self) -> Vec<RecordedFrame> {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_is_current_display() {
        let buf = PixelBuffer::new(4, 4);
        let now = Instant::now();
        let recorder = Recorder::start(&buf, now);
        let frames = recorder.finish();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pixels, buf);
        assert_eq!(frames[0].delay, INITIAL_FRAME_DELAY);
    }

    #[test]
    fn delays_are_floored() {
        let buf = PixelBuffer::new(2, 2);
        let t0 = Instant::now();
        let mut recorder = Recorder::start(&buf, t0);
        recorder.capture(&buf, t0 + Duration::from_millis(5));
        recorder.capture(&buf, t0 + Duration::from_millis(505));
        let frames = recorder.finish();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].delay, MIN_FRAME_DELAY);
        assert_eq!(frames[2].delay, Duration::from_millis(500));
    }
}

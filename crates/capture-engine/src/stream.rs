//! Fixed-rate capture stream.
//!
//! The stream owns a canvas at native resolution. Each rendered source frame
//! overwrites the canvas, and the frame clock decides how many constant-rate
//! output frames that canvas state covers. On end-of-stream the last canvas
//! is held until the source duration is reached.

use maskframe_common::clock::{DriftMeasurement, FrameClock, SessionClock};
use maskframe_filters::FrameBuffer;

#[derive(Debug)]
pub struct CaptureStream {
    canvas: FrameBuffer,
    clock: FrameClock,
    has_frame: bool,
    last_pts_secs: f64,
}

impl CaptureStream {
    pub fn new(width: usize, height: usize, fps: u32) -> Self {
        Self {
            canvas: FrameBuffer::new(width, height),
            clock: FrameClock::new(fps),
            has_frame: false,
            last_pts_secs: 0.0,
        }
    }

    pub fn canvas(&self) -> &FrameBuffer {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut FrameBuffer {
        &mut self.canvas
    }

    /// Record that the canvas now shows the frame at `pts_secs` and return
    /// how many output frames to emit for it. Zero means the frame was
    /// superseded before its slot came up.
    pub fn frame_rendered(&mut self, pts_secs: f64) -> u64 {
        self.has_frame = true;
        self.last_pts_secs = self.last_pts_secs.max(pts_secs);
        self.clock.due(pts_secs)
    }

    /// Output frames still owed up to `end_secs`, holding the last canvas.
    /// Falls back to the last presentation time when `end_secs` is unusable.
    pub fn flush(&mut self, end_secs: f64) -> u64 {
        if !self.has_frame {
            return 0;
        }
        let end = if end_secs.is_finite() && end_secs > 0.0 {
            end_secs
        } else {
            self.last_pts_secs
        };
        self.clock.flush_until(end)
    }

    pub fn emitted(&self) -> u64 {
        self.clock.emitted()
    }

    pub fn emitted_secs(&self) -> f64 {
        self.clock.emitted_secs()
    }

    pub fn fps(&self) -> u32 {
        self.clock.fps()
    }

    /// Emitted stream time against the source timeline.
    pub fn drift_against(&self, source_secs: f64) -> DriftMeasurement {
        DriftMeasurement {
            reference_ns: SessionClock::secs_to_ns(source_secs),
            measured_ns: SessionClock::secs_to_ns(self.emitted_secs()),
        }
    }

    /// One output frame interval in milliseconds.
    pub fn frame_interval_ms(&self) -> f64 {
        self.clock.interval_ns() as f64 / 1_000_000.0
    }
}

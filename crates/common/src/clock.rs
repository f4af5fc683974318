//! Clock and timing utilities for the capture stream.
//!
//! A capture session is anchored to a monotonic clock epoch recorded
//! when priming starts. This module provides utilities for:
//! - Capturing the epoch and measuring wall time spent encoding
//! - Pacing a fixed-rate output stream from variable source timestamps
//! - Calculating audio/video drift at finalization

use std::time::Instant;

use chrono::{DateTime, Utc};

/// Tolerance applied when converting timestamps to frame slots, so that
/// floating-point noise never shifts a frame into the neighbouring slot.
const SLOT_EPSILON: f64 = 1e-6;

/// Monotonic stopwatch for one capture run, stamped with the wall time it
/// started at.
#[derive(Debug, Clone)]
pub struct SessionClock {
    epoch: Instant,
    started_at: DateTime<Utc>,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Convert seconds to nanoseconds, saturating at zero.
    pub fn secs_to_ns(secs: f64) -> u64 {
        if secs.is_finite() && secs > 0.0 {
            (secs * 1_000_000_000.0) as u64
        } else {
            0
        }
    }
}

/// Emitted video time measured against the source timeline.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    pub reference_ns: u64,
    pub measured_ns: u64,
}

impl DriftMeasurement {
    /// Positive when the emitted stream runs longer than the source.
    pub fn drift_ns(&self) -> i64 {
        self.measured_ns as i64 - self.reference_ns as i64
    }

    pub fn drift_ms(&self) -> f64 {
        self.drift_ns() as f64 / 1_000_000.0
    }

    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}

/// Fixed-rate slot counter for the output capture stream.
///
/// Slot `k` starts at `k / fps` seconds. Source frames arrive with their own
/// presentation times; the clock reports how many output slots became due so
/// the caller can repeat (or skip) canvas snapshots to hold a constant rate.
#[derive(Debug)]
pub struct FrameClock {
    fps: u32,
    next_slot: u64,
}

impl FrameClock {
    /// Create a clock targeting the given frame rate.
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            next_slot: 0,
        }
    }

    /// Number of not-yet-emitted slots starting at or before `pts_secs`.
    pub fn due(&mut self, pts_secs: f64) -> u64 {
        let pts_secs = pts_secs.max(0.0);
        let through = (pts_secs * self.fps as f64 + SLOT_EPSILON).floor() as u64 + 1;
        self.advance_to(through)
    }

    /// Number of not-yet-emitted slots starting strictly before `end_secs`.
    pub fn flush_until(&mut self, end_secs: f64) -> u64 {
        let end_secs = end_secs.max(0.0);
        let total = (end_secs * self.fps as f64 - SLOT_EPSILON).ceil().max(0.0) as u64;
        self.advance_to(total)
    }

    /// Slots emitted so far.
    pub fn emitted(&self) -> u64 {
        self.next_slot
    }

    /// Stream time covered by emitted slots.
    pub fn emitted_secs(&self) -> f64 {
        self.next_slot as f64 / self.fps as f64
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        1_000_000_000 / self.fps as u64
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    fn advance_to(&mut self, slot_count: u64) -> u64 {
        if slot_count <= self.next_slot {
            return 0;
        }
        let due = slot_count - self.next_slot;
        self.next_slot = slot_count;
        due
    }
}

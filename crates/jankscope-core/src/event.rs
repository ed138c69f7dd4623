#![forbid(unsafe_code)]

//! Per-frame timing events delivered by an external frame-timing source.

use serde::{Deserialize, Serialize};

/// One rendered frame: when it started and how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Monotonic start timestamp in nanoseconds.
    pub start_timestamp_ns: i64,
    /// Frame duration in nanoseconds. Fractional values are accepted.
    pub duration_ns: f64,
}

impl FrameEvent {
    #[must_use]
    pub const fn new(start_timestamp_ns: i64, duration_ns: f64) -> Self {
        Self {
            start_timestamp_ns,
            duration_ns,
        }
    }

    /// Convenience constructor from milliseconds.
    #[must_use]
    pub fn from_millis(start_ms: f64, duration_ms: f64) -> Self {
        Self {
            start_timestamp_ns: (start_ms * 1e6) as i64,
            duration_ns: duration_ms * 1e6,
        }
    }

    /// Whether the duration is usable: finite and not negative.
    #[must_use]
    pub fn has_valid_duration(&self) -> bool {
        self.duration_ns.is_finite() && self.duration_ns >= 0.0
    }
}

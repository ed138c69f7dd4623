#![forbid(unsafe_code)]

//! One slow or frozen episode: a run of slow frames merged into a record.

use crate::clock::Clock;
use crate::config::DEFAULT_FROZEN_THRESHOLD_NS;

/// A slow-frame episode.
///
/// The start timestamp is fixed at creation. The duration grows while the
/// run stays continuous (see [`merge`](Self::merge)) and never shrinks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecord {
    start_timestamp_ns: i64,
    duration_ns: f64,
}

impl FrameRecord {
    #[must_use]
    pub const fn new(start_timestamp_ns: i64, duration_ns: f64) -> Self {
        Self {
            start_timestamp_ns,
            duration_ns,
        }
    }

    /// Monotonic timestamp of the first frame in the run.
    #[must_use]
    pub const fn start_timestamp_ns(&self) -> i64 {
        self.start_timestamp_ns
    }

    /// Accumulated duration of the run.
    #[must_use]
    pub const fn duration_ns(&self) -> f64 {
        self.duration_ns
    }

    /// Extend the run by `additional_ns`, saturating at
    /// `frozen_threshold_ns - 1`.
    ///
    /// A duration already at or above the ceiling is left as is.
    pub fn merge(&mut self, additional_ns: f64, frozen_threshold_ns: i64) {
        let ceiling = frozen_threshold_ns.saturating_sub(1) as f64;
        let merged = (self.duration_ns + additional_ns).min(ceiling);
        self.duration_ns = merged.max(self.duration_ns);
    }

    /// Frozen against the default 700ms threshold.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.is_frozen_at(DEFAULT_FROZEN_THRESHOLD_NS)
    }

    /// Frozen against an explicit threshold.
    #[must_use]
    pub fn is_frozen_at(&self, frozen_threshold_ns: i64) -> bool {
        self.duration_ns > frozen_threshold_ns as f64
    }

    /// Wall-clock start in milliseconds, mapped through `clock` at call time.
    #[must_use]
    pub fn wall_clock_start_ms(&self, clock: &dyn Clock) -> i64 {
        clock.to_wall_clock_ms(self.start_timestamp_ns)
    }
}

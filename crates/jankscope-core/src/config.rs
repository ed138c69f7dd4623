#![forbid(unsafe_code)]

//! Tunables for slow/frozen frame classification.
//!
//! Supplied once at construction and never mutated afterward. Deserializing
//! a partial document overrides only the fields it names.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Each record costs roughly 64 bytes once exported; 1000 keeps a report
/// payload around 64 KiB.
pub const DEFAULT_MAX_RECORDS: usize = 1000;
/// 700ms.
pub const DEFAULT_FROZEN_THRESHOLD_NS: i64 = 700_000_000;
/// One frame at 60 fps.
pub const DEFAULT_CONTINUOUS_MERGE_GAP_NS: i64 = 16_666_666;
/// 5s.
pub const DEFAULT_FREEZE_DURATION_THRESHOLD_NS: i64 = 5_000_000_000;
/// 1s.
pub const DEFAULT_MIN_SURFACE_LIFETIME_NS: i64 = 1_000_000_000;

/// Configuration for a [`FrameClassifier`](crate::FrameClassifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowFramesConfig {
    /// Capacity of the record buffer. Default: 1000.
    pub max_records: usize,

    /// A record whose duration exceeds this is frozen. Merged durations
    /// saturate one nanosecond below it. Default: 700ms.
    pub frozen_threshold_ns: i64,

    /// Maximum start-to-start gap for a slow frame to extend the previous
    /// record instead of opening a new one. Default: 16.67ms.
    pub continuous_merge_gap_ns: i64,

    /// Frozen records at least this long count as hangs and are excluded
    /// from the freeze rate. Default: 5s.
    pub freeze_duration_threshold_ns: i64,

    /// Sessions shorter than this report no rates. Default: 1s.
    pub min_surface_lifetime_ns: i64,
}

impl Default for SlowFramesConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            frozen_threshold_ns: DEFAULT_FROZEN_THRESHOLD_NS,
            continuous_merge_gap_ns: DEFAULT_CONTINUOUS_MERGE_GAP_NS,
            freeze_duration_threshold_ns: DEFAULT_FREEZE_DURATION_THRESHOLD_NS,
            min_surface_lifetime_ns: DEFAULT_MIN_SURFACE_LIFETIME_NS,
        }
    }
}

impl SlowFramesConfig {
    /// Set the record buffer capacity.
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Set the frozen threshold.
    #[must_use]
    pub fn with_frozen_threshold_ns(mut self, ns: i64) -> Self {
        self.frozen_threshold_ns = ns;
        self
    }

    /// Set the continuous merge gap.
    #[must_use]
    pub fn with_continuous_merge_gap_ns(mut self, ns: i64) -> Self {
        self.continuous_merge_gap_ns = ns;
        self
    }

    /// Set the hang threshold.
    #[must_use]
    pub fn with_freeze_duration_threshold_ns(mut self, ns: i64) -> Self {
        self.freeze_duration_threshold_ns = ns;
        self
    }

    /// Set the minimum session lifetime for rate reporting.
    #[must_use]
    pub fn with_min_surface_lifetime_ns(mut self, ns: i64) -> Self {
        self.min_surface_lifetime_ns = ns;
        self
    }

    /// Check that the thresholds are mutually consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frozen_threshold_ns <= 0 {
            return Err(ConfigError::NonPositiveFrozenThreshold {
                value: self.frozen_threshold_ns,
            });
        }
        if self.continuous_merge_gap_ns < 0 {
            return Err(ConfigError::NegativeMergeGap {
                value: self.continuous_merge_gap_ns,
            });
        }
        if self.freeze_duration_threshold_ns < self.frozen_threshold_ns {
            return Err(ConfigError::FreezeBelowFrozen {
                freeze: self.freeze_duration_threshold_ns,
                frozen: self.frozen_threshold_ns,
            });
        }
        if self.min_surface_lifetime_ns < 0 {
            return Err(ConfigError::NegativeSurfaceLifetime {
                value: self.min_surface_lifetime_ns,
            });
        }
        Ok(())
    }
}

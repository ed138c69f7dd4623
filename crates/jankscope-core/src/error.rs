#![forbid(unsafe_code)]

use thiserror::Error;

/// A [`SlowFramesConfig`](crate::SlowFramesConfig) that cannot be honored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("frozen_threshold_ns must be positive (got {value})")]
    NonPositiveFrozenThreshold { value: i64 },

    #[error("continuous_merge_gap_ns must not be negative (got {value})")]
    NegativeMergeGap { value: i64 },

    #[error(
        "freeze_duration_threshold_ns ({freeze}) must be at least frozen_threshold_ns ({frozen})"
    )]
    FreezeBelowFrozen { freeze: i64, frozen: i64 },

    #[error("min_surface_lifetime_ns must not be negative (got {value})")]
    NegativeSurfaceLifetime { value: i64 },
}

#![forbid(unsafe_code)]

//! Display refresh-rate query, used to derive the expected frame duration.

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Assumed when the display reports something unusable.
pub const FALLBACK_REFRESH_RATE_HZ: f64 = 60.0;

/// Reports the active display's refresh rate.
pub trait RefreshRateSource: Send + Sync {
    /// Refresh rate in Hz.
    fn refresh_rate_hz(&self) -> f64;

    /// Expected duration of a single frame, `1e9 / hz`.
    ///
    /// Non-positive or non-finite rates fall back to
    /// [`FALLBACK_REFRESH_RATE_HZ`].
    fn expected_frame_duration_ns(&self) -> f64 {
        expected_frame_duration_ns(self.refresh_rate_hz())
    }
}

/// `1e9 / hz`, with the 60 Hz fallback for unusable rates.
#[must_use]
pub fn expected_frame_duration_ns(refresh_rate_hz: f64) -> f64 {
    let hz = if refresh_rate_hz.is_finite() && refresh_rate_hz > 0.0 {
        refresh_rate_hz
    } else {
        FALLBACK_REFRESH_RATE_HZ
    };
    NANOS_PER_SECOND / hz
}

/// A refresh rate that never changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRefreshRate(pub f64);

impl Default for FixedRefreshRate {
    fn default() -> Self {
        Self(FALLBACK_REFRESH_RATE_HZ)
    }
}

impl RefreshRateSource for FixedRefreshRate {
    fn refresh_rate_hz(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_hz_is_one_sixtieth_of_a_second() {
        let ns = FixedRefreshRate(60.0).expected_frame_duration_ns();
        assert!((ns - 16_666_666.67).abs() < 1.0);
    }

    #[test]
    fn high_refresh_rate_shrinks_budget() {
        let ns = FixedRefreshRate(120.0).expected_frame_duration_ns();
        assert!((ns - 8_333_333.33).abs() < 1.0);
    }

    #[test]
    fn unusable_rates_fall_back_to_sixty() {
        let sixty = expected_frame_duration_ns(60.0);
        assert_eq!(expected_frame_duration_ns(0.0), sixty);
        assert_eq!(expected_frame_duration_ns(-90.0), sixty);
        assert_eq!(expected_frame_duration_ns(f64::NAN), sixty);
    }
}

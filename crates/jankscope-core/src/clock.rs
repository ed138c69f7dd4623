#![forbid(unsafe_code)]

//! Time sources for session stamping and monotonic → wall-clock mapping.
//!
//! Frame events carry monotonic nanosecond timestamps; reports carry
//! wall-clock milliseconds. [`Clock`] supplies both readings so the mapping
//! `wall = now_wall - (now_mono - t)` can be computed at read time.
//!
//! In production use [`SystemClock`]. Tests use [`LabClock`], which only
//! moves when told to.

use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicI64, Ordering};
use web_time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock readings.
pub trait Clock: Send + Sync {
    /// Monotonic time in nanoseconds. Only differences are meaningful.
    fn monotonic_ns(&self) -> i64;

    /// Wall-clock time in milliseconds since the Unix epoch.
    fn wall_clock_ms(&self) -> i64;

    /// Best-effort wall-clock equivalent of a monotonic timestamp.
    fn to_wall_clock_ms(&self, monotonic_ns: i64) -> i64 {
        let elapsed_ns = self.monotonic_ns().saturating_sub(monotonic_ns);
        self.wall_clock_ms().saturating_sub(elapsed_ns / NANOS_PER_MILLI)
    }
}

const NANOS_PER_MILLI: i64 = 1_000_000;

static PROCESS_EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Real clock: monotonic time relative to a process-wide epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create the system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn monotonic_ns(&self) -> i64 {
        let nanos = PROCESS_EPOCH.elapsed().as_nanos();
        i64::try_from(nanos).unwrap_or(i64::MAX)
    }

    fn wall_clock_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// A manually-advanceable clock for deterministic tests.
///
/// Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct LabClock {
    monotonic_ns: Arc<AtomicI64>,
    wall_ms: Arc<AtomicI64>,
}

impl LabClock {
    /// Start a lab clock at the given readings.
    #[must_use]
    pub fn new(monotonic_ns: i64, wall_ms: i64) -> Self {
        Self {
            monotonic_ns: Arc::new(AtomicI64::new(monotonic_ns)),
            wall_ms: Arc::new(AtomicI64::new(wall_ms)),
        }
    }

    /// Advance both timelines by `delta`.
    pub fn advance(&self, delta: Duration) {
        let ns = i64::try_from(delta.as_nanos()).unwrap_or(i64::MAX);
        self.monotonic_ns.fetch_add(ns, Ordering::AcqRel);
        self.wall_ms.fetch_add(ns / NANOS_PER_MILLI, Ordering::AcqRel);
    }

    /// Advance by a whole number of milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for LabClock {
    fn default() -> Self {
        Self::new(0, 1_700_000_000_000)
    }
}

impl Clock for LabClock {
    fn monotonic_ns(&self) -> i64 {
        self.monotonic_ns.load(Ordering::Acquire)
    }

    fn wall_clock_ms(&self) -> i64 {
        self.wall_ms.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_clock_advances_both_timelines() {
        let clock = LabClock::new(5_000, 1_000);
        clock.advance_ms(250);
        assert_eq!(clock.monotonic_ns(), 5_000 + 250_000_000);
        assert_eq!(clock.wall_clock_ms(), 1_250);
    }

    #[test]
    fn lab_clock_clones_share_time() {
        let a = LabClock::default();
        let b = a.clone();
        a.advance_ms(10);
        assert_eq!(a.monotonic_ns(), b.monotonic_ns());
        assert_eq!(a.wall_clock_ms(), b.wall_clock_ms());
    }

    #[test]
    fn wall_clock_mapping_subtracts_elapsed() {
        let clock = LabClock::new(0, 10_000);
        clock.advance_ms(3_000);
        // An event 1s into the timeline happened 2s before "now".
        assert_eq!(clock.to_wall_clock_ms(1_000_000_000), 11_000);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.monotonic_ns();
        let b = clock.monotonic_ns();
        assert!(b >= a);
        assert!(clock.wall_clock_ms() > 0);
    }
}

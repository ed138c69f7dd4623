#![forbid(unsafe_code)]

//! The shared performance report and its read-side views.
//!
//! # Concurrency
//!
//! A [`PerformanceReport`] is mutated in place by the hot frame path and
//! read by a consumer on another thread. Both sides go through the same
//! [`ReportHandle`] mutex, held for the full duration of one event's
//! processing or one read, so a reader never observes a half-applied event.
//! Each report has its own lock; independent listeners never contend.
//!
//! # Access modes
//!
//! - [`ReportHandle::snapshot`] copies the records and leaves them buffered.
//! - [`ReportHandle::drain`] hands the records over and empties the buffer.
//!   Counters are untouched by either.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::bounded_buffer::BoundedRecordBuffer;
use crate::clock::Clock;
use crate::config::SlowFramesConfig;
use crate::frame_record::FrameRecord;

const NANOS_PER_MILLI: f64 = 1_000_000.0;
const MILLIS_PER_SECOND: f64 = 1_000.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Mutable aggregate of one monitoring session.
#[derive(Debug, Clone)]
pub struct PerformanceReport {
    pub(crate) records: BoundedRecordBuffer<FrameRecord>,
    pub(crate) slow_frame_count: u64,
    pub(crate) ignored_frame_count: u64,
    pub(crate) rejected_event_count: u64,
    pub(crate) total_frame_duration_ns: f64,
    pub(crate) slow_frame_duration_ns: f64,
    pub(crate) session_start_ms: Option<i64>,
    pub(crate) session_end_ms: Option<i64>,
    config: SlowFramesConfig,
}

impl PerformanceReport {
    /// Create an empty report whose record buffer holds
    /// `config.max_records` entries.
    #[must_use]
    pub fn new(config: SlowFramesConfig) -> Self {
        Self {
            records: BoundedRecordBuffer::new(config.max_records),
            slow_frame_count: 0,
            ignored_frame_count: 0,
            rejected_event_count: 0,
            total_frame_duration_ns: 0.0,
            slow_frame_duration_ns: 0.0,
            session_start_ms: None,
            session_end_ms: None,
            config,
        }
    }

    /// Buffered slow/frozen records, oldest first.
    #[must_use]
    pub fn records(&self) -> &BoundedRecordBuffer<FrameRecord> {
        &self.records
    }

    /// The most recent (possibly still open) record.
    #[must_use]
    pub fn last_record(&self) -> Option<&FrameRecord> {
        self.records.peek_last()
    }

    /// Remove and return the oldest buffered record.
    pub fn remove_oldest_record(&mut self) -> Option<FrameRecord> {
        self.records.remove_oldest()
    }

    #[must_use]
    pub const fn slow_frame_count(&self) -> u64 {
        self.slow_frame_count
    }

    #[must_use]
    pub const fn ignored_frame_count(&self) -> u64 {
        self.ignored_frame_count
    }

    /// Events dropped for carrying a negative or non-finite duration.
    #[must_use]
    pub const fn rejected_event_count(&self) -> u64 {
        self.rejected_event_count
    }

    /// Sum of every accepted event's duration, ignored frames included.
    #[must_use]
    pub const fn total_frame_duration_ns(&self) -> f64 {
        self.total_frame_duration_ns
    }

    /// Sum of the durations of non-ignored (slow) frames.
    #[must_use]
    pub const fn slow_frame_duration_ns(&self) -> f64 {
        self.slow_frame_duration_ns
    }

    #[must_use]
    pub const fn session_start_ms(&self) -> Option<i64> {
        self.session_start_ms
    }

    #[must_use]
    pub const fn session_end_ms(&self) -> Option<i64> {
        self.session_end_ms
    }

    /// `end - start`, once both have been stamped.
    #[must_use]
    pub fn session_duration_ms(&self) -> Option<i64> {
        Some(self.session_end_ms? - self.session_start_ms?)
    }

    /// The configuration this report was built with.
    #[must_use]
    pub const fn config(&self) -> &SlowFramesConfig {
        &self.config
    }

    pub(crate) fn stamp_session(&mut self, start_ms: i64, end_ms: i64) {
        self.session_start_ms = Some(start_ms);
        self.session_end_ms = Some(end_ms);
    }

    /// Copy the current state without consuming any records.
    #[must_use]
    pub fn snapshot(&self, clock: &dyn Clock) -> ReportSnapshot {
        let records = self
            .records
            .iter()
            .map(|r| RecordSnapshot::capture(r, self.config.frozen_threshold_ns, clock))
            .collect();
        self.build_snapshot(records)
    }

    /// Take every buffered record; counters stay in place.
    pub fn drain(&mut self, clock: &dyn Clock) -> ReportSnapshot {
        let frozen_threshold_ns = self.config.frozen_threshold_ns;
        let records = self
            .records
            .drain()
            .iter()
            .map(|r| RecordSnapshot::capture(r, frozen_threshold_ns, clock))
            .collect();
        self.build_snapshot(records)
    }

    fn build_snapshot(&self, records: Vec<RecordSnapshot>) -> ReportSnapshot {
        let summary = ReportSummary::compute(self, &records);
        ReportSnapshot {
            slow_frame_count: self.slow_frame_count,
            ignored_frame_count: self.ignored_frame_count,
            rejected_event_count: self.rejected_event_count,
            total_frame_duration_ns: self.total_frame_duration_ns,
            slow_frame_duration_ns: self.slow_frame_duration_ns,
            session_start_ms: self.session_start_ms,
            session_end_ms: self.session_end_ms,
            session_duration_ms: self.session_duration_ms(),
            capacity: self.records.capacity(),
            records,
            summary,
        }
    }
}

/// Shared handle to a [`PerformanceReport`] guarded by its own mutex.
///
/// Cloning yields another handle to the **same** report.
#[derive(Clone)]
pub struct ReportHandle {
    inner: Arc<Mutex<PerformanceReport>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ReportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportHandle")
            .field("report", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl ReportHandle {
    #[must_use]
    pub fn new(report: PerformanceReport, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(report)),
            clock,
        }
    }

    /// Lock the report. A panic on another thread while holding the lock
    /// does not make the report unreadable.
    pub fn lock(&self) -> MutexGuard<'_, PerformanceReport> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with shared access to the report under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&PerformanceReport) -> R) -> R {
        f(&self.lock())
    }

    /// Non-destructive copy of the report.
    #[must_use]
    pub fn snapshot(&self) -> ReportSnapshot {
        self.lock().snapshot(self.clock.as_ref())
    }

    /// Copy the report and remove every buffered record.
    pub fn drain(&self) -> ReportSnapshot {
        self.lock().drain(self.clock.as_ref())
    }

    /// Whether two handles point at the same report.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

/// Read-side copy of one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordSnapshot {
    pub start_timestamp_ns: i64,
    /// Wall-clock start, mapped when the snapshot was taken.
    pub wall_clock_start_ms: i64,
    pub duration_ns: f64,
    pub frozen: bool,
}

impl RecordSnapshot {
    fn capture(record: &FrameRecord, frozen_threshold_ns: i64, clock: &dyn Clock) -> Self {
        Self {
            start_timestamp_ns: record.start_timestamp_ns(),
            wall_clock_start_ms: record.wall_clock_start_ms(clock),
            duration_ns: record.duration_ns(),
            frozen: record.is_frozen_at(frozen_threshold_ns),
        }
    }

    /// Duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ns / NANOS_PER_MILLI
    }
}

/// Derived rates over a snapshot's records and counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    /// Records whose duration exceeds the frozen threshold.
    pub frozen_record_count: usize,
    /// Frozen records at least `freeze_duration_threshold_ns` long.
    pub hang_count: usize,
    /// Milliseconds of slow rendering per second of rendering.
    pub slow_frame_rate_ms_per_s: Option<f64>,
    /// Seconds frozen per hour of session, hangs excluded.
    pub freeze_rate_s_per_hour: Option<f64>,
}

impl ReportSummary {
    fn compute(report: &PerformanceReport, records: &[RecordSnapshot]) -> Self {
        let config = report.config();
        let hang_floor = config.freeze_duration_threshold_ns as f64;

        let mut frozen_record_count = 0;
        let mut hang_count = 0;
        let mut frozen_ns = 0.0;
        for record in records.iter().filter(|r| r.frozen) {
            frozen_record_count += 1;
            if record.duration_ns >= hang_floor {
                hang_count += 1;
            } else {
                frozen_ns += record.duration_ns;
            }
        }

        let session_ms = report.session_duration_ms();
        let min_lifetime_ms = config.min_surface_lifetime_ns as f64 / NANOS_PER_MILLI;
        let too_short = session_ms.is_some_and(|ms| (ms as f64) < min_lifetime_ms);

        let total_ns = report.total_frame_duration_ns;
        let slow_frame_rate_ms_per_s = (!too_short && total_ns > 0.0)
            .then(|| report.slow_frame_duration_ns / total_ns * MILLIS_PER_SECOND);

        let freeze_rate_s_per_hour = session_ms
            .filter(|&ms| ms > 0 && !too_short)
            .map(|ms| {
                let frozen_s = frozen_ns / NANOS_PER_MILLI / MILLIS_PER_SECOND;
                let session_h = ms as f64 / MILLIS_PER_SECOND / SECONDS_PER_HOUR;
                frozen_s / session_h
            });

        Self {
            frozen_record_count,
            hang_count,
            slow_frame_rate_ms_per_s,
            freeze_rate_s_per_hour,
        }
    }
}

/// Complete read-side copy of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub slow_frame_count: u64,
    pub ignored_frame_count: u64,
    pub rejected_event_count: u64,
    pub total_frame_duration_ns: f64,
    pub slow_frame_duration_ns: f64,
    pub session_start_ms: Option<i64>,
    pub session_end_ms: Option<i64>,
    pub session_duration_ms: Option<i64>,
    /// Record buffer capacity.
    pub capacity: usize,
    pub records: Vec<RecordSnapshot>,
    pub summary: ReportSummary,
}

impl ReportSnapshot {
    /// Serialize to a pretty JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// One JSON object per record, newline terminated.
    #[must_use]
    pub fn to_jsonl_records(&self) -> String {
        let mut out = String::new();
        for (idx, record) in self.records.iter().enumerate() {
            let line = serde_json::json!({
                "record_idx": idx,
                "start_timestamp_ns": record.start_timestamp_ns,
                "wall_clock_start_ms": record.wall_clock_start_ms,
                "duration_ms": record.duration_ms(),
                "frozen": record.frozen,
            });
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}

#![forbid(unsafe_code)]

//! Slow/frozen frame classification.
//!
//! [`FrameClassifier`] consumes one [`FrameEvent`] at a time and folds it
//! into its [`PerformanceReport`]:
//!
//! 1. Every accepted event adds to `total_frame_duration_ns`.
//! 2. Frames faster than the expected frame duration (`1e9 / refresh_hz`)
//!    only bump `ignored_frame_count`.
//! 3. Slow frames add to `slow_frame_duration_ns`, then either open a new
//!    record or extend the last one.
//!
//! Continuity is judged start-to-start: the gap is measured from the
//! previous **record's start**, not the previous frame's end. A gap above
//! `continuous_merge_gap_ns` opens a new record; anything else (including a
//! negative gap from out-of-order timestamps) merges.
//!
//! Events with a negative or non-finite duration are dropped before step 1
//! and counted in `rejected_event_count`.
//!
//! # Threading
//!
//! [`FrameListener::on_event`] may be called from a worker thread while the
//! session callbacks and report reads run on the control thread. The whole
//! of one event's processing happens under the report lock, and the
//! classifier state stays locked until it finishes, so a fresh session start
//! waits for an in-flight event and no event lands in a discarded report.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::SlowFramesConfig;
use crate::event::FrameEvent;
use crate::frame_record::FrameRecord;
use crate::refresh::RefreshRateSource;
use crate::report::{PerformanceReport, ReportHandle};

/// Observer of a frame-event stream and its session boundaries.
///
/// Implementations must tolerate `on_event` arriving on a different thread
/// from the session callbacks.
pub trait FrameListener: Send + Sync {
    /// One frame finished rendering.
    fn on_event(&self, event: &FrameEvent);

    /// Monitoring started. `resumed` is true when an earlier paused session
    /// continues.
    fn on_session_start(&self, _resumed: bool) {}

    /// Monitoring stopped. `is_final` is false for a pause.
    fn on_session_end(&self, _is_final: bool) {}
}

/// What a single event did to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Negative or non-finite duration; nothing recorded.
    Rejected,
    /// Faster than the expected frame duration.
    Ignored,
    /// Opened a new slow-frame record.
    NewRecord,
    /// Extended the previous record.
    Merged,
    /// Slow but zero-length on a record boundary; counted, not recorded.
    Skipped,
}

#[derive(Debug)]
struct ClassifierState {
    report: Option<ReportHandle>,
    session_start_ms: i64,
    expected_frame_duration_ns: f64,
}

/// Default [`FrameListener`]: classifies frames into a bounded report.
pub struct FrameClassifier {
    config: SlowFramesConfig,
    refresh: Arc<dyn RefreshRateSource>,
    clock: Arc<dyn Clock>,
    state: Mutex<ClassifierState>,
}

impl std::fmt::Debug for FrameClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClassifier")
            .field("config", &self.config)
            .field(
                "expected_frame_duration_ns",
                &self.expected_frame_duration_ns(),
            )
            .finish_non_exhaustive()
    }
}

impl FrameClassifier {
    /// Create a classifier using the system clock.
    #[must_use]
    pub fn new(config: SlowFramesConfig, refresh: Arc<dyn RefreshRateSource>) -> Self {
        Self::with_clock(config, refresh, Arc::new(SystemClock::new()))
    }

    /// Create a classifier with an explicit clock.
    #[must_use]
    pub fn with_clock(
        config: SlowFramesConfig,
        refresh: Arc<dyn RefreshRateSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let expected_frame_duration_ns = refresh.expected_frame_duration_ns();
        Self {
            config,
            refresh,
            clock,
            state: Mutex::new(ClassifierState {
                report: None,
                session_start_ms: 0,
                expected_frame_duration_ns,
            }),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SlowFramesConfig {
        &self.config
    }

    /// Frame duration below which a frame is not slow.
    #[must_use]
    pub fn expected_frame_duration_ns(&self) -> f64 {
        self.state().expected_frame_duration_ns
    }

    /// The current report, created on first access.
    ///
    /// The handle stays valid after a fresh session start replaces the
    /// report; it then refers to the previous session's data.
    #[must_use]
    pub fn report(&self) -> ReportHandle {
        let mut state = self.state();
        self.report_or_init(&mut state).clone()
    }

    /// Classify one event. This is the body of [`FrameListener::on_event`].
    pub fn process(&self, event: &FrameEvent) -> FrameOutcome {
        // Lock order is state then report, as in `on_session_end`.
        let mut state = self.state();
        let expected_ns = state.expected_frame_duration_ns;
        let handle = self.report_or_init(&mut state).clone();
        let mut report = handle.lock();
        classify(&mut report, event, expected_ns, &self.config)
    }

    fn state(&self) -> MutexGuard<'_, ClassifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report_or_init<'s>(&self, state: &'s mut ClassifierState) -> &'s ReportHandle {
        state.report.get_or_insert_with(|| {
            ReportHandle::new(PerformanceReport::new(self.config), Arc::clone(&self.clock))
        })
    }
}

impl FrameListener for FrameClassifier {
    fn on_event(&self, event: &FrameEvent) {
        self.process(event);
    }

    fn on_session_start(&self, resumed: bool) {
        if resumed {
            return;
        }
        let mut state = self.state();
        state.report = None;
        state.session_start_ms = self.clock.wall_clock_ms();
        state.expected_frame_duration_ns = self.refresh.expected_frame_duration_ns();
        debug!(
            expected_frame_duration_ns = state.expected_frame_duration_ns,
            "classifier session reset"
        );
    }

    fn on_session_end(&self, is_final: bool) {
        if !is_final {
            return;
        }
        let state = self.state();
        if let Some(report) = &state.report {
            report
                .lock()
                .stamp_session(state.session_start_ms, self.clock.wall_clock_ms());
        }
    }
}

/// Fold one event into `report`.
fn classify(
    report: &mut PerformanceReport,
    event: &FrameEvent,
    expected_frame_duration_ns: f64,
    config: &SlowFramesConfig,
) -> FrameOutcome {
    if !event.has_valid_duration() {
        report.rejected_event_count += 1;
        return FrameOutcome::Rejected;
    }
    let duration_ns = event.duration_ns;

    report.total_frame_duration_ns += duration_ns;

    if duration_ns < expected_frame_duration_ns {
        report.ignored_frame_count += 1;
        return FrameOutcome::Ignored;
    }

    report.slow_frame_count += 1;
    report.slow_frame_duration_ns += duration_ns;

    let start_ns = event.start_timestamp_ns;
    let continuous = report.records.peek_last().is_some_and(|previous| {
        start_ns.saturating_sub(previous.start_timestamp_ns()) <= config.continuous_merge_gap_ns
    });

    if continuous {
        if let Some(previous) = report.records.peek_last_mut() {
            previous.merge(duration_ns, config.frozen_threshold_ns);
        }
        return FrameOutcome::Merged;
    }

    if duration_ns > 0.0 {
        report.records.offer(FrameRecord::new(start_ns, duration_ns));
        FrameOutcome::NewRecord
    } else {
        FrameOutcome::Skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::LabClock;
    use crate::refresh::FixedRefreshRate;

    const MS: f64 = 1_000_000.0;
    const MS_I: i64 = 1_000_000;

    fn classifier(config: SlowFramesConfig) -> (FrameClassifier, LabClock) {
        let clock = LabClock::default();
        let classifier = FrameClassifier::with_clock(
            config,
            Arc::new(FixedRefreshRate(60.0)),
            Arc::new(clock.clone()),
        );
        (classifier, clock)
    }

    fn feed(classifier: &FrameClassifier, events: &[(i64, f64)]) -> Vec<FrameOutcome> {
        events
            .iter()
            .map(|&(start, dur)| classifier.process(&FrameEvent::new(start, dur)))
            .collect()
    }

    #[test]
    fn gap_is_measured_from_previous_record_start() {
        let (c, _) = classifier(SlowFramesConfig::default());
        let outcomes = feed(
            &c,
            &[(0, 20.0 * MS), (20 * MS_I, 25.0 * MS), (60 * MS_I, 10.0 * MS)],
        );
        assert_eq!(
            outcomes,
            vec![
                FrameOutcome::NewRecord,
                FrameOutcome::NewRecord,
                FrameOutcome::Ignored
            ]
        );

        let snap = c.report().snapshot();
        assert_eq!(snap.ignored_frame_count, 1);
        assert!((snap.slow_frame_duration_ns - 45.0 * MS).abs() < 1e-3);
        assert!((snap.total_frame_duration_ns - 55.0 * MS).abs() < 1e-3);
        assert_eq!(snap.records.len(), 2);
        assert_eq!(snap.records[0].start_timestamp_ns, 0);
        assert!((snap.records[0].duration_ns - 20.0 * MS).abs() < 1e-3);
        assert_eq!(snap.records[1].start_timestamp_ns, 20 * MS_I);
        assert!((snap.records[1].duration_ns - 25.0 * MS).abs() < 1e-3);
    }

    #[test]
    fn close_starts_merge_into_one_record() {
        let (c, _) = classifier(SlowFramesConfig::default());
        let outcomes = feed(&c, &[(0, 20.0 * MS), (10 * MS_I, 30.0 * MS)]);
        assert_eq!(outcomes, vec![FrameOutcome::NewRecord, FrameOutcome::Merged]);

        let report = c.report();
        report.with(|r| {
            assert_eq!(r.records().len(), 1);
            let record = r.last_record().unwrap();
            assert_eq!(record.start_timestamp_ns(), 0);
            assert!((record.duration_ns() - 50.0 * MS).abs() < 1e-3);
        });
    }

    #[test]
    fn merged_duration_saturates_below_frozen() {
        let (c, _) = classifier(SlowFramesConfig::default());
        feed(&c, &[(0, 500.0 * MS), (MS_I, 500.0 * MS)]);
        c.report().with(|r| {
            let record = r.last_record().unwrap();
            assert_eq!(record.duration_ns(), 699_999_999.0);
            assert!(!record.is_frozen());
        });
    }

    #[test]
    fn single_long_frame_is_frozen() {
        let (c, _) = classifier(SlowFramesConfig::default());
        feed(&c, &[(0, 900.0 * MS)]);
        let snap = c.report().snapshot();
        assert!(snap.records[0].frozen);
        assert_eq!(snap.summary.frozen_record_count, 1);
    }

    #[test]
    fn fast_frames_never_touch_records() {
        let (c, _) = classifier(SlowFramesConfig::default());
        feed(&c, &[(0, 20.0 * MS)]);
        for i in 1..=5 {
            assert_eq!(
                c.process(&FrameEvent::new(i * MS_I, 5.0 * MS)),
                FrameOutcome::Ignored
            );
        }
        c.report().with(|r| {
            assert_eq!(r.ignored_frame_count(), 5);
            assert_eq!(r.records().len(), 1);
            assert!((r.last_record().unwrap().duration_ns() - 20.0 * MS).abs() < 1e-3);
        });
    }

    #[test]
    fn rejected_durations_change_nothing_else() {
        let (c, _) = classifier(SlowFramesConfig::default());
        assert_eq!(c.process(&FrameEvent::new(0, -5.0)), FrameOutcome::Rejected);
        assert_eq!(c.process(&FrameEvent::new(0, f64::NAN)), FrameOutcome::Rejected);
        c.report().with(|r| {
            assert_eq!(r.rejected_event_count(), 2);
            assert_eq!(r.total_frame_duration_ns(), 0.0);
            assert_eq!(r.ignored_frame_count(), 0);
            assert!(r.records().is_empty());
        });
    }

    #[test]
    fn out_of_order_start_merges() {
        let (c, _) = classifier(SlowFramesConfig::default());
        let outcomes = feed(&c, &[(100 * MS_I, 20.0 * MS), (50 * MS_I, 20.0 * MS)]);
        assert_eq!(outcomes, vec![FrameOutcome::NewRecord, FrameOutcome::Merged]);
    }

    #[test]
    fn minimum_frozen_threshold_merges_without_growth() {
        let (c, _) = classifier(SlowFramesConfig::default().with_frozen_threshold_ns(i64::MIN));
        let outcomes = feed(&c, &[(0, 20.0 * MS), (MS_I, 20.0 * MS)]);
        assert_eq!(outcomes, vec![FrameOutcome::NewRecord, FrameOutcome::Merged]);
        c.report().with(|r| {
            assert_eq!(r.slow_frame_count(), 2);
            assert_eq!(r.last_record().unwrap().duration_ns(), 20.0 * MS);
        });
    }

    #[test]
    fn zero_capacity_still_counts() {
        let (c, _) = classifier(SlowFramesConfig::default().with_max_records(0));
        feed(&c, &[(0, 20.0 * MS), (100 * MS_I, 30.0 * MS)]);
        c.report().with(|r| {
            assert!(r.records().is_empty());
            assert_eq!(r.slow_frame_count(), 2);
        });
    }

    #[test]
    fn zero_length_slow_frame_is_skipped() {
        let clock = LabClock::default();
        // Built-in sources never report a zero budget.
        struct ZeroBudget;
        impl RefreshRateSource for ZeroBudget {
            fn refresh_rate_hz(&self) -> f64 {
                60.0
            }
            fn expected_frame_duration_ns(&self) -> f64 {
                0.0
            }
        }
        let c = FrameClassifier::with_clock(
            SlowFramesConfig::default(),
            Arc::new(ZeroBudget),
            Arc::new(clock),
        );
        assert_eq!(c.process(&FrameEvent::new(0, 0.0)), FrameOutcome::Skipped);
        c.report().with(|r| {
            assert!(r.records().is_empty());
            assert_eq!(r.slow_frame_count(), 1);
        });
    }

    #[test]
    fn eviction_bounds_records() {
        let (c, _) = classifier(SlowFramesConfig::default().with_max_records(3));
        for i in 0..10 {
            c.process(&FrameEvent::new(i * 100 * MS_I, 20.0 * MS));
        }
        let snap = c.report().snapshot();
        assert_eq!(snap.records.len(), 3);
        assert_eq!(snap.records[0].start_timestamp_ns, 700 * MS_I);
        assert_eq!(snap.slow_frame_count, 10);
    }

    #[test]
    fn fresh_start_discards_report_resume_keeps_it() {
        let (c, _) = classifier(SlowFramesConfig::default());
        c.on_session_start(false);
        feed(&c, &[(0, 20.0 * MS)]);
        let first = c.report();

        c.on_session_end(false);
        c.on_session_start(true);
        assert!(ReportHandle::ptr_eq(&first, &c.report()));
        assert_eq!(c.report().snapshot().records.len(), 1);

        c.on_session_start(false);
        assert!(!ReportHandle::ptr_eq(&first, &c.report()));
        assert!(c.report().snapshot().records.is_empty());
    }

    #[test]
    fn final_end_stamps_session_pause_does_not() {
        let (c, clock) = classifier(SlowFramesConfig::default());
        let start_ms = clock.wall_clock_ms();
        c.on_session_start(false);
        feed(&c, &[(0, 20.0 * MS)]);

        clock.advance_ms(1_500);
        c.on_session_end(false);
        assert_eq!(c.report().with(|r| r.session_end_ms()), None);

        clock.advance_ms(500);
        c.on_session_end(true);
        c.report().with(|r| {
            assert_eq!(r.session_start_ms(), Some(start_ms));
            assert_eq!(r.session_end_ms(), Some(start_ms + 2_000));
            assert_eq!(r.session_duration_ms(), Some(2_000));
        });
    }

    #[test]
    fn fresh_start_requeries_refresh_rate() {
        struct Switching(Mutex<f64>);
        impl RefreshRateSource for Switching {
            fn refresh_rate_hz(&self) -> f64 {
                *self.0.lock().unwrap()
            }
        }
        let source = Arc::new(Switching(Mutex::new(60.0)));
        let c = FrameClassifier::with_clock(
            SlowFramesConfig::default(),
            source.clone(),
            Arc::new(LabClock::default()),
        );
        assert!((c.expected_frame_duration_ns() - 16_666_666.67).abs() < 1.0);

        *source.0.lock().unwrap() = 120.0;
        c.on_session_start(true);
        assert!((c.expected_frame_duration_ns() - 16_666_666.67).abs() < 1.0);
        c.on_session_start(false);
        assert!((c.expected_frame_duration_ns() - 8_333_333.33).abs() < 1.0);
    }
}

//! Drive a [`SessionAggregator`] from a parsed trace.
//!
//! Surfaces are in-process stand-ins that deliver frames to whatever sink
//! the aggregator attached to them, and only while their handle is enabled.
//! The lab clock follows the trace: it advances to the end of each frame and
//! on explicit `advance` lines, so session stamps and wall-clock mappings are
//! deterministic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use jankscope_core::{
    Clock, FixedRefreshRate, FrameClassifier, FrameEvent, FrameListener, LabClock, ReportSnapshot,
    SessionAggregator, SlowFramesConfig, TimingSourceProvider, TrackingHandle,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{HarnessError, Result};
use crate::trace::{TraceEntry, TraceLine};

const NANOS_PER_MILLI: i64 = 1_000_000;

struct Attachment {
    sink: Arc<dyn FrameListener>,
    enabled: Arc<AtomicBool>,
}

/// A named surface whose frames come from the trace.
pub struct ReplaySurface {
    name: String,
    attachment: Mutex<Option<Attachment>>,
}

impl ReplaySurface {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachment: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver `event` if a tracking handle is attached and enabled.
    pub fn render(&self, event: &FrameEvent) -> bool {
        let attachment = self
            .attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match attachment.as_ref() {
            Some(a) if a.enabled.load(Ordering::Acquire) => {
                a.sink.on_event(event);
                true
            }
            _ => false,
        }
    }
}

struct ReplayHandle {
    enabled: Arc<AtomicBool>,
}

impl TrackingHandle for ReplayHandle {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl Drop for ReplayHandle {
    fn drop(&mut self) {
        self.enabled.store(false, Ordering::Release);
    }
}

/// Attaches to every [`ReplaySurface`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayTimingSource;

impl TimingSourceProvider<ReplaySurface> for ReplayTimingSource {
    fn create_and_track(
        &self,
        surface: &Arc<ReplaySurface>,
        sink: Arc<dyn FrameListener>,
    ) -> Option<Box<dyn TrackingHandle>> {
        let enabled = Arc::new(AtomicBool::new(true));
        *surface
            .attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Attachment {
            sink,
            enabled: Arc::clone(&enabled),
        });
        Some(Box::new(ReplayHandle { enabled }))
    }
}

/// Knobs for one replay run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayOptions {
    pub config: SlowFramesConfig,
    pub refresh_rate_hz: f64,
    pub listeners: usize,
    /// Drain records instead of snapshotting them.
    pub drain: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            config: SlowFramesConfig::default(),
            refresh_rate_hz: 60.0,
            listeners: 1,
            drain: false,
        }
    }
}

/// Result of a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayOutcome {
    pub trace_lines: usize,
    pub delivered_frames: u64,
    /// Frames for surfaces that were untracked or paused.
    pub undelivered_frames: u64,
    pub tracked_surfaces: usize,
    pub reports: Vec<ReportSnapshot>,
}

impl ReplayOutcome {
    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Records of every report as JSONL, each line tagged with its listener.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for (listener, report) in self.reports.iter().enumerate() {
            for line in report.to_jsonl_records().lines() {
                out.push_str(&format!("{{\"listener\":{listener},{}\n", &line[1..]));
            }
        }
        out
    }
}

/// Replay `entries` and collect every listener's report.
pub fn replay(entries: &[TraceEntry], options: &ReplayOptions) -> Result<ReplayOutcome> {
    options.config.validate()?;
    if options.listeners == 0 {
        return Err(HarnessError::invalid("at least one listener is required"));
    }

    let clock = LabClock::default();
    let classifiers: Vec<Arc<FrameClassifier>> = (0..options.listeners)
        .map(|_| {
            Arc::new(FrameClassifier::with_clock(
                options.config,
                Arc::new(FixedRefreshRate(options.refresh_rate_hz)),
                Arc::new(clock.clone()),
            ))
        })
        .collect();
    let listeners = classifiers
        .iter()
        .map(|c| Arc::clone(c) as Arc<dyn FrameListener>)
        .collect();
    let mut aggregator = SessionAggregator::new(listeners, ReplayTimingSource);

    let mut surfaces: BTreeMap<String, Arc<ReplaySurface>> = BTreeMap::new();
    let mut delivered_frames = 0u64;
    let mut undelivered_frames = 0u64;

    for entry in entries {
        match &entry.directive {
            TraceLine::Start { surface } => {
                aggregator.start_tracking(surface_named(&mut surfaces, surface));
            }
            TraceLine::Pause { surface } => {
                aggregator.pause_tracking(surface_named(&mut surfaces, surface));
            }
            TraceLine::Stop { surface } => {
                aggregator.stop_tracking(surface_named(&mut surfaces, surface));
            }
            TraceLine::Drop { surface } => {
                if surfaces.remove(surface).is_none() {
                    debug!(
                        line = entry.line,
                        surface = surface.as_str(),
                        "drop of unknown surface"
                    );
                }
            }
            TraceLine::Frame { surface, .. } => {
                let Some(event) = entry.directive.frame_event() else {
                    continue;
                };
                follow_frame(&clock, &event);
                if surface_named(&mut surfaces, surface).render(&event) {
                    delivered_frames += 1;
                } else {
                    undelivered_frames += 1;
                }
            }
            TraceLine::Advance { ms } => clock.advance_ms(*ms),
        }
    }

    let tracked_surfaces = aggregator.tracked_surface_count();
    let reports = classifiers
        .iter()
        .map(|c| {
            let handle = c.report();
            if options.drain {
                handle.drain()
            } else {
                handle.snapshot()
            }
        })
        .collect();

    info!(
        trace_lines = entries.len(),
        delivered_frames, undelivered_frames, tracked_surfaces, "replay finished"
    );

    Ok(ReplayOutcome {
        trace_lines: entries.len(),
        delivered_frames,
        undelivered_frames,
        tracked_surfaces,
        reports,
    })
}

fn surface_named<'a>(
    surfaces: &'a mut BTreeMap<String, Arc<ReplaySurface>>,
    name: &str,
) -> &'a Arc<ReplaySurface> {
    surfaces
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(ReplaySurface::new(name)))
}

/// Move the clock to the end of `event`, in whole milliseconds so the
/// monotonic and wall timelines stay in step.
fn follow_frame(clock: &LabClock, event: &FrameEvent) {
    let duration_ns = if event.has_valid_duration() {
        event.duration_ns as i64
    } else {
        0
    };
    let end_ns = event.start_timestamp_ns.saturating_add(duration_ns);
    let behind_ms = end_ns.saturating_sub(clock.monotonic_ns()) / NANOS_PER_MILLI;
    if behind_ms > 0 {
        clock.advance(Duration::from_millis(behind_ms as u64));
    }
}

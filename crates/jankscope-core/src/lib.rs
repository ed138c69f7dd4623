#![forbid(unsafe_code)]

//! Core: slow/frozen frame classification, bounded record storage, and
//! per-surface monitoring sessions.
//!
//! Data flows leaf-first:
//!
//! ```text
//! timing source ─▶ SessionAggregator::on_event ─▶ FrameListener::on_event (×N)
//!                                                   └▶ FrameClassifier ─▶ PerformanceReport
//! ```
//!
//! The hot path (per-frame events) may run on any thread; lifecycle calls
//! (`start_tracking` / `pause_tracking` / `stop_tracking`) are expected to
//! be serialized by the caller on a single control thread.

pub mod aggregator;
pub mod bounded_buffer;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod frame_record;
pub mod refresh;
pub mod report;

pub use aggregator::{SessionAggregator, SurfaceState, TimingSourceProvider, TrackingHandle};
pub use bounded_buffer::BoundedRecordBuffer;
pub use classifier::{FrameClassifier, FrameListener, FrameOutcome};
pub use clock::{Clock, LabClock, SystemClock};
pub use config::SlowFramesConfig;
pub use error::ConfigError;
pub use event::FrameEvent;
pub use frame_record::FrameRecord;
pub use refresh::{FixedRefreshRate, RefreshRateSource};
pub use report::{PerformanceReport, RecordSnapshot, ReportHandle, ReportSnapshot, ReportSummary};

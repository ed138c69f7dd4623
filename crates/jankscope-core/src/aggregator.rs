#![forbid(unsafe_code)]

//! Listener fan-out and per-surface monitoring sessions.
//!
//! A [`SessionAggregator`] owns an ordered list of [`FrameListener`]s and a
//! registry mapping each tracked surface to the [`TrackingHandle`] that an
//! external [`TimingSourceProvider`] created for it.
//!
//! # Surface state machine
//!
//! ```text
//! Untracked ──start──▶ Tracking ──pause──▶ Paused
//!     ▲                  │  ▲                │
//!     └──────stop────────┘  └─────start──────┤
//!     ▲                                      │
//!     └──────────────────stop────────────────┘
//! ```
//!
//! # Registry ownership
//!
//! The registry holds surfaces by [`Weak`] reference only; it is never the
//! reason a surface stays alive. Entries whose surface has been dropped are
//! swept (and their handles disabled) at the start of every lifecycle call
//! or on an explicit [`SessionAggregator::sweep`].
//!
//! # Threading
//!
//! Lifecycle methods take `&mut self`: the caller serializes them on one
//! control thread. Events arrive through [`SessionAggregator::sink`], which
//! is `Send + Sync` and may be driven from any thread.

use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use crate::classifier::FrameListener;
use crate::event::FrameEvent;

/// A native per-surface tracking registration.
///
/// Dropping a handle should detach it from its surface.
pub trait TrackingHandle: Send {
    /// Turn event delivery on or off without detaching.
    fn set_enabled(&mut self, enabled: bool);

    /// Whether events are currently delivered.
    fn is_enabled(&self) -> bool;
}

/// Creates tracking handles bound to a surface and an event sink.
pub trait TimingSourceProvider<S: ?Sized>: Send + Sync {
    /// Attach to `surface` and start delivering its frames to `sink`.
    ///
    /// Returns `None` when the surface cannot be attached.
    fn create_and_track(
        &self,
        surface: &Arc<S>,
        sink: Arc<dyn FrameListener>,
    ) -> Option<Box<dyn TrackingHandle>>;
}

/// Monitoring state of one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Untracked,
    Tracking,
    Paused,
}

/// Immutable, ordered fan-out to every registered listener.
struct ListenerSet {
    listeners: Vec<Arc<dyn FrameListener>>,
}

impl FrameListener for ListenerSet {
    fn on_event(&self, event: &FrameEvent) {
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }

    fn on_session_start(&self, resumed: bool) {
        for listener in &self.listeners {
            listener.on_session_start(resumed);
        }
    }

    fn on_session_end(&self, is_final: bool) {
        for listener in &self.listeners {
            listener.on_session_end(is_final);
        }
    }
}

struct SurfaceEntry<S: ?Sized> {
    surface: Weak<S>,
    handle: Box<dyn TrackingHandle>,
}

/// Fans one frame-event stream out to N listeners and manages the
/// start/pause/resume/stop lifecycle of each tracked surface.
pub struct SessionAggregator<S: ?Sized> {
    listeners: Arc<ListenerSet>,
    provider: Box<dyn TimingSourceProvider<S>>,
    entries: Vec<SurfaceEntry<S>>,
}

impl<S: ?Sized> std::fmt::Debug for SessionAggregator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAggregator")
            .field("listeners", &self.listeners.listeners.len())
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<S: ?Sized> SessionAggregator<S> {
    /// Create an aggregator delivering to `listeners` in the given order.
    pub fn new(
        listeners: Vec<Arc<dyn FrameListener>>,
        provider: impl TimingSourceProvider<S> + 'static,
    ) -> Self {
        Self {
            listeners: Arc::new(ListenerSet { listeners }),
            provider: Box::new(provider),
            entries: Vec::new(),
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.listeners.len()
    }

    /// The event sink handed to timing sources. Safe to call from any thread.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn FrameListener> {
        self.listeners.clone()
    }

    /// Forward `event` to every listener, in registration order.
    pub fn on_event(&self, event: &FrameEvent) {
        self.listeners.on_event(event);
    }

    /// Start, or resume, monitoring `surface`.
    ///
    /// Listeners are told whether this resumes an existing session. A
    /// surface the provider cannot attach to stays untracked.
    pub fn start_tracking(&mut self, surface: &Arc<S>) {
        self.sweep();
        let known = self.position(surface);
        self.listeners.on_session_start(known.is_some());

        if let Some(idx) = known {
            debug!(target: "jankscope::aggregator", "resuming surface tracking");
            self.entries[idx].handle.set_enabled(true);
            return;
        }

        debug!(target: "jankscope::aggregator", "starting surface tracking");
        let sink: Arc<dyn FrameListener> = self.listeners.clone();
        match self.provider.create_and_track(surface, sink) {
            Some(handle) => self.entries.push(SurfaceEntry {
                surface: Arc::downgrade(surface),
                handle,
            }),
            None => debug!(target: "jankscope::aggregator", "tracking handle unavailable"),
        }
    }

    /// Suspend monitoring of `surface`, keeping its handle for a resume.
    pub fn pause_tracking(&mut self, surface: &Arc<S>) {
        self.sweep();
        match self.position(surface) {
            Some(idx) => {
                debug!(target: "jankscope::aggregator", "pausing surface tracking");
                let handle = &mut self.entries[idx].handle;
                if handle.is_enabled() {
                    handle.set_enabled(false);
                }
            }
            None => debug!(target: "jankscope::aggregator", "pause on untracked surface"),
        }
        self.listeners.on_session_end(false);
    }

    /// End monitoring of `surface` and release its handle.
    pub fn stop_tracking(&mut self, surface: &Arc<S>) {
        self.sweep();
        match self.position(surface) {
            Some(idx) => {
                debug!(target: "jankscope::aggregator", "stopping surface tracking");
                let mut entry = self.entries.remove(idx);
                entry.handle.set_enabled(false);
            }
            None => debug!(target: "jankscope::aggregator", "stop on untracked surface"),
        }
        self.listeners.on_session_end(true);
    }

    /// Current state of `surface`.
    #[must_use]
    pub fn surface_state(&self, surface: &Arc<S>) -> SurfaceState {
        match self.position(surface) {
            None => SurfaceState::Untracked,
            Some(idx) if self.entries[idx].handle.is_enabled() => SurfaceState::Tracking,
            Some(_) => SurfaceState::Paused,
        }
    }

    /// Number of live tracked surfaces, after sweeping dropped ones.
    pub fn tracked_surface_count(&mut self) -> usize {
        self.sweep();
        self.entries.len()
    }

    /// Drop entries whose surface no longer exists, disabling their handles.
    ///
    /// Returns how many entries were removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain_mut(|entry| {
            if entry.surface.strong_count() > 0 {
                return true;
            }
            if entry.handle.is_enabled() {
                warn!(
                    target: "jankscope::aggregator",
                    "surface dropped while tracked; releasing handle"
                );
            }
            entry.handle.set_enabled(false);
            false
        });
        before - self.entries.len()
    }

    fn position(&self, surface: &Arc<S>) -> Option<usize> {
        let target = Arc::as_ptr(surface);
        self.entries
            .iter()
            .position(|entry| std::ptr::addr_eq(entry.surface.as_ptr(), target))
    }
}

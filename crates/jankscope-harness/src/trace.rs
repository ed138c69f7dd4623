//! JSONL frame-timing traces.
//!
//! One JSON object per line, discriminated by `kind`:
//!
//! ```text
//! {"kind":"start","surface":"main"}
//! {"kind":"frame","surface":"main","start_timestamp_ns":0,"duration_ns":24000000}
//! {"kind":"advance","ms":1000}
//! {"kind":"pause","surface":"main"}
//! {"kind":"stop","surface":"main"}
//! {"kind":"drop","surface":"main"}
//! ```
//!
//! `surface` defaults to `"main"`. Blank lines and lines starting with `#`
//! are skipped.

use std::io::BufRead;

use jankscope_core::FrameEvent;
use serde::Deserialize;

use crate::error::{HarnessError, Result};

pub const DEFAULT_SURFACE: &str = "main";

fn default_surface() -> String {
    DEFAULT_SURFACE.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceLine {
    /// Begin or resume tracking a surface.
    Start {
        #[serde(default = "default_surface")]
        surface: String,
    },
    /// Suspend tracking, keeping the session.
    Pause {
        #[serde(default = "default_surface")]
        surface: String,
    },
    /// End the session for a surface.
    Stop {
        #[serde(default = "default_surface")]
        surface: String,
    },
    /// Release the replay's own reference to a surface.
    Drop {
        #[serde(default = "default_surface")]
        surface: String,
    },
    /// A rendered frame.
    Frame {
        #[serde(default = "default_surface")]
        surface: String,
        start_timestamp_ns: i64,
        duration_ns: f64,
    },
    /// Move the clock forward without rendering.
    Advance { ms: u64 },
}

impl TraceLine {
    /// The frame event carried by a `frame` line.
    #[must_use]
    pub fn frame_event(&self) -> Option<FrameEvent> {
        match self {
            Self::Frame {
                start_timestamp_ns,
                duration_ns,
                ..
            } => Some(FrameEvent::new(*start_timestamp_ns, *duration_ns)),
            _ => None,
        }
    }
}

/// A parsed line and its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub line: usize,
    pub directive: TraceLine,
}

/// Parse one line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line_no: usize, raw: &str) -> Result<Option<TraceEntry>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let directive: TraceLine = serde_json::from_str(trimmed)
        .map_err(|error| HarnessError::malformed(line_no, error.to_string()))?;
    Ok(Some(TraceEntry {
        line: line_no,
        directive,
    }))
}

/// Parse a whole trace, failing on the first malformed line.
pub fn read_trace(reader: impl BufRead) -> Result<Vec<TraceEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(entry) = parse_line(idx + 1, &line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

//! Counters for a capture session.
//!
//! Capture is best effort: throttled moves, full-queue drops and writer
//! progress are all counted here so a degraded session is visible instead of
//! silently incomplete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between the capture callbacks and the writer.
#[derive(Debug)]
pub struct CaptureStats {
    /// Keyboard events handed to the queue
    keyboard_events: AtomicU64,
    /// Mouse events handed to the queue
    mouse_events: AtomicU64,
    /// Mouse moves throttled before becoming events
    moves_suppressed: AtomicU64,
    /// Events lost because the queue was full or the writer had exited
    events_dropped: AtomicU64,
    /// Lines written and flushed by the writer
    events_written: AtomicU64,
    session_start: DateTime<Utc>,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self {
            keyboard_events: AtomicU64::new(0),
            mouse_events: AtomicU64::new(0),
            moves_suppressed: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            events_written: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_keyboard_event(&self) {
        self.keyboard_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mouse_event(&self) {
        self.mouse_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_suppressed(&self) {
        self.moves_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.events_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of events dropped so far.
    pub fn dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            keyboard_events: self.keyboard_events.load(Ordering::Relaxed),
            mouse_events: self.mouse_events.load(Ordering::Relaxed),
            moves_suppressed: self.moves_suppressed.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_written: self.events_written.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Keyboard events captured: {}\n\
             - Mouse events captured: {}\n\
             - Mouse moves throttled: {}\n\
             - Events dropped: {}\n\
             - Events written: {}\n\
             - Session duration: {} seconds",
            stats.keyboard_events,
            stats.mouse_events,
            stats.moves_suppressed,
            stats.events_dropped,
            stats.events_written,
            stats.session_duration_secs
        )
    }
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`CaptureStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureStatsSnapshot {
    pub keyboard_events: u64,
    pub mouse_events: u64,
    pub moves_suppressed: u64,
    pub events_dropped: u64,
    pub events_written: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

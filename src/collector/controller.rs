//! The capture controller.
//!
//! Bridges device callbacks into [`Event`]s and hands them to the session
//! writer through a bounded queue. Callbacks never wait on the writer: when
//! the queue is full the event is dropped and counted.

use crate::collector::hook::{InputHook, InputSink, Key, MouseButton};
use crate::collector::metrics::{key_identity, now_secs, KeyTiming, MouseState};
use crate::collector::stats::{CaptureStats, CaptureStatsSnapshot};
use crate::collector::types::Event;
use crate::config::{SourceConfig, DEFAULT_QUEUE_CAPACITY};
use crate::persist::{
    create_session_path, session_now, spawn_writer, WriterHandle, WriterMessage, WriterState,
};
use chrono_tz::Tz;
use crossbeam_channel::{bounded, Sender};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Settings for a [`CaptureController`].
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Root directory for session logs
    pub base_dir: PathBuf,
    pub sources: SourceConfig,
    pub queue_capacity: usize,
    /// Upper bound for each of the two shutdown waits in `stop`
    pub stop_timeout: Duration,
    /// Time zone used for session file names
    pub timezone: Option<Tz>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("sessions"),
            sources: SourceConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stop_timeout: Duration::from_secs(5),
            timezone: None,
        }
    }
}

/// Errors that can occur while starting a capture session.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Failed to create session directory under {path:?}: {source}")]
    SessionPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn session writer: {0}")]
    WriterSpawn(#[source] std::io::Error),

    #[error("Input hook registration failed: {0}")]
    Hook(String),
}

/// The sink registered with the input hook for one session.
struct CaptureSink {
    sources: SourceConfig,
    sender: Sender<WriterMessage>,
    keys: Mutex<KeyTiming>,
    mouse: Mutex<MouseState>,
    stats: Arc<CaptureStats>,
}

impl CaptureSink {
    fn enqueue(&self, event: Event) {
        if self.sender.try_send(WriterMessage::Event(event)).is_err() {
            self.stats.record_dropped();
        }
    }

    fn key_event(&self, key: &Key, pressed: bool) {
        if !self.sources.keyboard {
            return;
        }
        let key = key_identity(key);
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        let now = now_secs();
        let event = if pressed {
            keys.press(now, &key)
        } else {
            keys.release(now, &key)
        };
        self.stats.record_keyboard_event();
        // Enqueue under the lock so queue order matches state order.
        self.enqueue(event);
    }
}

impl InputSink for CaptureSink {
    fn on_key_press(&self, key: &Key) {
        self.key_event(key, true);
    }

    fn on_key_release(&self, key: &Key) {
        self.key_event(key, false);
    }

    fn on_move(&self, x: i32, y: i32) {
        if !self.sources.mouse {
            return;
        }
        let mut mouse = self.mouse.lock().unwrap_or_else(PoisonError::into_inner);
        match mouse.movement(now_secs(), x, y) {
            Some(event) => {
                self.stats.record_mouse_event();
                self.enqueue(event);
            }
            None => self.stats.record_move_suppressed(),
        }
    }

    fn on_click(&self, x: i32, y: i32, button: MouseButton, pressed: bool) {
        if !self.sources.mouse {
            return;
        }
        let mut mouse = self.mouse.lock().unwrap_or_else(PoisonError::into_inner);
        let event = mouse.click(now_secs(), x, y, button, pressed);
        self.stats.record_mouse_event();
        self.enqueue(event);
    }

    fn on_scroll(&self, x: i32, y: i32, dx: i32, dy: i32) {
        if !self.sources.mouse {
            return;
        }
        // Held so scrolls stay ordered with the other mouse events.
        let _mouse = self.mouse.lock().unwrap_or_else(PoisonError::into_inner);
        let event = MouseState::scroll(now_secs(), x, y, dx, dy);
        self.stats.record_mouse_event();
        self.enqueue(event);
    }
}

struct ActiveSession {
    path: PathBuf,
    sender: Sender<WriterMessage>,
    writer: WriterHandle,
}

/// Owns the hook registration and the writer for capture sessions.
pub struct CaptureController<H: InputHook> {
    config: CaptureConfig,
    hook: H,
    stats: Arc<CaptureStats>,
    session: Option<ActiveSession>,
    last_path: Option<PathBuf>,
    last_writer_state: WriterState,
}

impl<H: InputHook> CaptureController<H> {
    pub fn new(config: CaptureConfig, hook: H) -> Self {
        Self {
            config,
            hook,
            stats: Arc::new(CaptureStats::new()),
            session: None,
            last_path: None,
            last_writer_state: WriterState::Idle,
        }
    }

    /// Start a capture session.
    ///
    /// Resolves a fresh session file, starts the writer and registers with the
    /// input hook. Calling this while a session is running does nothing.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.session.is_some() {
            tracing::debug!("capture already running; start ignored");
            return Ok(());
        }

        let now = session_now(self.config.timezone);
        let path = create_session_path(&self.config.base_dir, now).map_err(|source| {
            CollectorError::SessionPath {
                path: self.config.base_dir.clone(),
                source,
            }
        })?;
        if path.exists() {
            tracing::warn!(
                path = %path.display(),
                "session file already exists; this session will append to it"
            );
        }

        let stats = Arc::new(CaptureStats::new());
        let (sender, receiver) = bounded(self.config.queue_capacity.max(1));
        let mut writer =
            spawn_writer(path.clone(), receiver, stats.clone()).map_err(CollectorError::WriterSpawn)?;

        let sink = Arc::new(CaptureSink {
            sources: self.config.sources.clone(),
            sender: sender.clone(),
            keys: Mutex::new(KeyTiming::new()),
            mouse: Mutex::new(MouseState::new()),
            stats: stats.clone(),
        });

        if let Err(e) = self.hook.register(sink) {
            // Wind the writer down before reporting the failure.
            let _ = sender.send_timeout(WriterMessage::Shutdown, self.config.stop_timeout);
            let _ = writer.wait(self.config.stop_timeout);
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            keyboard = self.config.sources.keyboard,
            mouse = self.config.sources.mouse,
            "capture started"
        );

        self.stats = stats;
        self.last_path = Some(path.clone());
        self.session = Some(ActiveSession {
            path,
            sender,
            writer,
        });
        Ok(())
    }

    /// Stop the current session.
    ///
    /// Unregisters from the hook, queues the end-of-stream marker and waits (up
    /// to the configured timeout) for the writer to drain. Calling this when
    /// nothing is running does nothing.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        self.hook.unregister();

        let timeout = self.config.stop_timeout;
        if session
            .sender
            .send_timeout(WriterMessage::Shutdown, timeout)
            .is_err()
        {
            tracing::warn!("could not queue end-of-stream marker; writer is gone or stalled");
        }
        drop(session.sender);

        match session.writer.wait(timeout) {
            Some(reason) => {
                tracing::info!(path = %session.path.display(), reason = ?reason, "capture stopped")
            }
            None => tracing::warn!(
                path = %session.path.display(),
                timeout_secs = timeout.as_secs_f64(),
                "session writer did not finish in time"
            ),
        }
        self.last_writer_state = session.writer.state();

        let stats = self.stats.snapshot();
        if stats.events_dropped > 0 {
            tracing::warn!(dropped = stats.events_dropped, "events were dropped during capture");
        }
    }

    /// Check if a session is currently running.
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// File of the current session, or of the most recent one after `stop`.
    pub fn session_path(&self) -> Option<&PathBuf> {
        self.session
            .as_ref()
            .map(|s| &s.path)
            .or(self.last_path.as_ref())
    }

    /// Writer state of the current (or most recent) session.
    pub fn writer_state(&self) -> WriterState {
        match &self.session {
            Some(session) => session.writer.state(),
            None => self.last_writer_state.clone(),
        }
    }

    /// Counters of the current (or most recent) session.
    pub fn stats(&self) -> CaptureStatsSnapshot {
        self.stats.snapshot()
    }

    /// Events dropped so far in the current (or most recent) session.
    pub fn dropped_events(&self) -> u64 {
        self.stats.dropped()
    }

    /// Human-readable session counters.
    pub fn summary(&self) -> String {
        self.stats.summary()
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }
}

impl<H: InputHook> Drop for CaptureController<H> {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Device callback registration.
//!
//! The platform input hook is an external capability: something that can
//! deliver keyboard and mouse callbacks to a registered [`InputSink`]. This
//! module defines that seam plus two in-process implementations:
//!
//! - [`NoopHook`] never emits anything. It lets the crate and binary build and
//!   run on hosts without an input backend.
//! - [`ManualHook`] forwards callbacks injected through an [`InputInjector`].
//!   Tests and demos use it to drive a capture session deterministically.

use crate::collector::controller::CollectorError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// A key as reported by the input backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// A key that produced a character
    Char(char),
    /// A special key with a symbolic name (e.g. `shift`, `enter`)
    Named(String),
    /// A raw virtual key code with no character or name
    Code(u32),
    /// The backend could not identify the key
    Unidentified,
}

/// Mouse button reported with a click callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Unknown,
}

impl MouseButton {
    /// The string stored in the `button` field of click events.
    pub fn as_wire(&self) -> &'static str {
        match self {
            MouseButton::Left => "Button.left",
            MouseButton::Right => "Button.right",
            MouseButton::Middle => "Button.middle",
            MouseButton::Unknown => "Button.unknown",
        }
    }
}

/// Receiver of raw device callbacks.
///
/// Keyboard and mouse callbacks may arrive on different threads, so
/// implementations must be shareable. Callbacks must return quickly and must
/// not panic.
pub trait InputSink: Send + Sync {
    fn on_key_press(&self, key: &Key);
    fn on_key_release(&self, key: &Key);
    fn on_move(&self, x: i32, y: i32);
    fn on_click(&self, x: i32, y: i32, button: MouseButton, pressed: bool);
    fn on_scroll(&self, x: i32, y: i32, dx: i32, dy: i32);
}

/// A source of device callbacks that a sink can be attached to.
pub trait InputHook: Send {
    /// Start delivering callbacks to `sink`.
    fn register(&mut self, sink: Arc<dyn InputSink>) -> Result<(), CollectorError>;

    /// Stop delivering callbacks. Calling this when nothing is registered is a no-op.
    fn unregister(&mut self);
}

/// A hook that accepts registration but never emits callbacks.
#[derive(Debug, Default)]
pub struct NoopHook {
    registered: bool,
}

impl NoopHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl InputHook for NoopHook {
    fn register(&mut self, _sink: Arc<dyn InputSink>) -> Result<(), CollectorError> {
        tracing::debug!("noop input hook registered; no device events will be delivered");
        self.registered = true;
        Ok(())
    }

    fn unregister(&mut self) {
        self.registered = false;
    }
}

type SinkSlot = Arc<RwLock<Option<Arc<dyn InputSink>>>>;

/// A hook driven by hand through [`InputInjector`] handles.
#[derive(Default)]
pub struct ManualHook {
    slot: SinkSlot,
    registrations: Arc<AtomicUsize>,
}

impl ManualHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cloneable handle that delivers callbacks to whatever sink is registered.
    pub fn injector(&self) -> InputInjector {
        InputInjector {
            slot: self.slot.clone(),
            registrations: self.registrations.clone(),
        }
    }
}

impl InputHook for ManualHook {
    fn register(&mut self, sink: Arc<dyn InputSink>) -> Result<(), CollectorError> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(sink);
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unregister(&mut self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}

/// Injects device callbacks into a [`ManualHook`].
///
/// Callbacks injected while nothing is registered are discarded.
#[derive(Clone)]
pub struct InputInjector {
    slot: SinkSlot,
    registrations: Arc<AtomicUsize>,
}

impl InputInjector {
    fn with_sink(&self, f: impl FnOnce(&dyn InputSink)) {
        let sink = self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            f(sink.as_ref());
        }
    }

    /// Whether a sink is currently registered.
    pub fn is_registered(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Total number of `register` calls seen by the hook.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn key_press(&self, key: Key) {
        self.with_sink(|sink| sink.on_key_press(&key));
    }

    pub fn key_release(&self, key: Key) {
        self.with_sink(|sink| sink.on_key_release(&key));
    }

    /// Press and release a key back to back.
    pub fn tap(&self, key: Key) {
        self.key_press(key.clone());
        self.key_release(key);
    }

    pub fn mouse_move(&self, x: i32, y: i32) {
        self.with_sink(|sink| sink.on_move(x, y));
    }

    pub fn click(&self, x: i32, y: i32, button: MouseButton, pressed: bool) {
        self.with_sink(|sink| sink.on_click(x, y, button, pressed));
    }

    pub fn scroll(&self, x: i32, y: i32, dx: i32, dy: i32) {
        self.with_sink(|sink| sink.on_scroll(x, y, dx, dy));
    }
}

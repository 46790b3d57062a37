//! Event capture for FlowState.
//!
//! Device callbacks arrive through an [`InputHook`], are turned into
//! [`Event`]s with derived timing metrics, and are queued for the session
//! writer by the [`CaptureController`].

pub mod controller;
pub mod hook;
pub mod metrics;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use controller::{CaptureConfig, CaptureController, CollectorError};
pub use hook::{InputHook, InputInjector, InputSink, Key, ManualHook, MouseButton, NoopHook};
pub use metrics::{key_identity, KeyTiming, MouseState};
pub use stats::{CaptureStats, CaptureStatsSnapshot};
pub use types::{
    Event, EventPayload, KeyPressData, KeyReleaseData, MouseClickData, MouseMoveData,
    MouseScrollData,
};

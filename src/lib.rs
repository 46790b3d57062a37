//! FlowState Sensor - keystroke and mouse dynamics capture with log auditing.
//!
//! This library captures fine-grained input timing (key dwell and flight
//! times, pointer velocity, click intervals) into per-session JSON-lines logs,
//! and audits those logs offline for structural integrity and anomalies.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        FlowState Sensor                       │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────┐   ┌──────────┐  │
//! │  │ Input hook │──▶│  Capture   │──▶│ Queue  │──▶│  Writer  │  │
//! │  │ (callbacks)│   │ controller │   │(bounded│   │ (thread) │  │
//! │  └────────────┘   └────────────┘   └────────┘   └──────────┘  │
//! │                         │                             │       │
//! │                         ▼                             ▼       │
//! │                   ┌────────────┐              ┌────────────┐  │
//! │                   │  Metrics   │              │  Session   │  │
//! │                   │ (timings)  │              │ log (.json)│  │
//! │                   └────────────┘              └────────────┘  │
//! │                                                       │       │
//! │                                                       ▼       │
//! │                                               ┌────────────┐  │
//! │                                               │  Analyzer  │  │
//! │                                               └────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use flowstate_sensor::collector::{CaptureConfig, CaptureController, Key, ManualHook};
//! use flowstate_sensor::analysis::{analyze_log, render_report};
//!
//! let hook = ManualHook::new();
//! let input = hook.injector();
//! let mut controller = CaptureController::new(CaptureConfig::default(), hook);
//!
//! controller.start().expect("Failed to start capture");
//! input.tap(Key::Char('a'));
//! controller.stop();
//!
//! let path = controller.session_path().expect("session path").clone();
//! let stats = analyze_log(&path).expect("Failed to analyze log");
//! println!("{}", render_report(&stats));
//! ```

pub mod analysis;
pub mod collector;
pub mod config;
pub mod logging;
pub mod persist;

// Re-export key types at crate root for convenience
pub use analysis::{analyze_log, render_report, AnalysisError, AnalysisStats};
pub use collector::{
    CaptureConfig, CaptureController, CollectorError, Event, EventPayload, InputHook, InputSink,
};
pub use config::{Config, ConfigError, SourceConfig};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use persist::{StopReason, WriterState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Disclosure shown before capture starts.
pub const CAPTURE_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                FLOWSTATE SENSOR - CAPTURE NOTICE                 ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  While a session is running this agent records:                  ║
║    • Which keys are pressed and released, with timestamps        ║
║    • Cursor coordinates and movement speed                       ║
║    • Mouse button clicks and scroll deltas                       ║
║                                                                  ║
║  Everything is written to a local session file only.             ║
║  Nothing is uploaded. Delete the session file to discard it.     ║
║                                                                  ║
║  Audit a session with:                                           ║
║    flowstate analyze <session file>                              ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

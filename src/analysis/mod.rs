//! Offline auditing of session logs.
//!
//! The analyzer reads a log written by the session writer (or anything in the
//! same newline-delimited JSON format) and reports integrity counts, per-type
//! event counts and timing anomalies.

pub mod analyzer;
pub mod report;

pub use analyzer::{
    analyze_log, analyze_reader, coerce_number, AnalysisError, AnalysisStats, AnomalyCounts,
    AnomalyExamples, NegativeTiming, OrderViolation, TimingField, VelocitySpike,
    EXTREME_VELOCITY_THRESHOLD,
};
pub use report::render_report;

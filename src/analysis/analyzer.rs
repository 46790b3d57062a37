//! Single-pass integrity and anomaly analysis of session logs.
//!
//! The analyzer tolerates damaged logs: every line is judged on its own, and
//! a line that fails to decode is counted and skipped without affecting the
//! rest of the pass. Only failing to open the file is an error.

use crate::collector::types::{KEY_PRESS, KEY_RELEASE, MOUSE_CLICK, MOUSE_MOVE, MOUSE_SCROLL};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Mouse velocities above this (pixels per second) are anomalous.
pub const EXTREME_VELOCITY_THRESHOLD: f64 = 50_000.0;

/// Bucket for events without a usable type.
pub const OTHER: &str = "other";

/// Buckets present in every report, in report order.
pub const FIXED_EVENT_TYPES: [&str; 6] = [
    KEY_PRESS,
    KEY_RELEASE,
    MOUSE_MOVE,
    MOUSE_CLICK,
    MOUSE_SCROLL,
    OTHER,
];

/// Errors that prevent an analysis pass from starting.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Log file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anomaly counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalyCounts {
    pub timestamp_order: u64,
    pub extreme_velocity: u64,
    pub negative_dwell_or_flight: u64,
}

/// A timestamp lower than the one before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderViolation {
    pub previous: f64,
    pub current: f64,
}

/// A mouse move faster than [`EXTREME_VELOCITY_THRESHOLD`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocitySpike {
    pub timestamp: Option<f64>,
    pub velocity: f64,
}

/// Which key timing went negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingField {
    DwellTime,
    FlightTime,
}

impl fmt::Display for TimingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingField::DwellTime => write!(f, "dwell_time"),
            TimingField::FlightTime => write!(f, "flight_time"),
        }
    }
}

/// A negative dwell or flight time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegativeTiming {
    pub field: TimingField,
    pub value: f64,
}

/// Every anomaly occurrence, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalyExamples {
    pub timestamp_order: Vec<OrderViolation>,
    pub extreme_velocity: Vec<VelocitySpike>,
    pub negative_dwell_or_flight: Vec<NegativeTiming>,
}

/// Result of one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStats {
    pub total_lines: u64,
    pub valid_json: u64,
    pub invalid_json: u64,
    /// Lines that were empty after trimming
    pub blank_lines: u64,
    /// Fixed buckets plus one per novel `event_type` string
    pub event_counts: BTreeMap<String, u64>,
    pub anomalies: AnomalyCounts,
    pub examples: AnomalyExamples,
}

impl Default for AnalysisStats {
    fn default() -> Self {
        Self {
            total_lines: 0,
            valid_json: 0,
            invalid_json: 0,
            blank_lines: 0,
            event_counts: FIXED_EVENT_TYPES
                .iter()
                .map(|name| (name.to_string(), 0))
                .collect(),
            anomalies: AnomalyCounts::default(),
            examples: AnomalyExamples::default(),
        }
    }
}

impl AnalysisStats {
    /// Count for one bucket (zero when absent).
    pub fn count(&self, event_type: &str) -> u64 {
        self.event_counts.get(event_type).copied().unwrap_or(0)
    }

    /// `other` plus every bucket that is not one of the five known event types.
    pub fn other_total(&self) -> u64 {
        self.event_counts
            .iter()
            .filter(|(name, _)| !FIXED_EVENT_TYPES[..5].contains(&name.as_str()))
            .map(|(_, count)| count)
            .sum()
    }

    /// Event types seen that are not one of the fixed buckets.
    pub fn novel_types(&self) -> impl Iterator<Item = (&str, u64)> {
        self.event_counts
            .iter()
            .filter(|(name, _)| !FIXED_EVENT_TYPES.contains(&name.as_str()))
            .map(|(name, count)| (name.as_str(), *count))
    }
}

/// Analyze the log file at `path`.
pub fn analyze_log(path: &Path) -> Result<AnalysisStats, AnalysisError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            AnalysisError::NotFound(path.to_path_buf())
        } else {
            AnalysisError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    tracing::debug!(path = %path.display(), "analyzing session log");
    analyze_reader(BufReader::new(file)).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Analyze newline-delimited JSON from any buffered reader.
///
/// Only a failing reader produces an error; malformed content never does.
pub fn analyze_reader<R: BufRead>(mut reader: R) -> std::io::Result<AnalysisStats> {
    let mut analyzer = LineAnalyzer::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        analyzer.feed(&buf);
    }

    Ok(analyzer.finish())
}

/// Incremental state of a pass.
#[derive(Debug, Default)]
struct LineAnalyzer {
    stats: AnalysisStats,
    previous_ts: Option<f64>,
}

impl LineAnalyzer {
    fn feed(&mut self, raw: &[u8]) {
        self.stats.total_lines += 1;

        let Ok(text) = std::str::from_utf8(raw) else {
            self.stats.invalid_json += 1;
            return;
        };
        let line = text.trim();
        if line.is_empty() {
            self.stats.blank_lines += 1;
            return;
        }

        let event: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(_) => {
                self.stats.invalid_json += 1;
                return;
            }
        };
        self.stats.valid_json += 1;

        let empty = Map::new();
        let fields = event.as_object().unwrap_or(&empty);

        let timestamp = fields.get("timestamp").and_then(coerce_number);
        self.check_order(timestamp);

        let event_type = match fields.get("event_type") {
            Some(Value::String(name)) => name.as_str(),
            _ => OTHER,
        };
        *self
            .stats
            .event_counts
            .entry(event_type.to_string())
            .or_insert(0) += 1;

        let data = fields
            .get("data")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        match event_type {
            MOUSE_MOVE => self.check_velocity(timestamp, data),
            KEY_PRESS | KEY_RELEASE => self.check_key_timing(data),
            _ => {}
        }
    }

    fn check_order(&mut self, timestamp: Option<f64>) {
        let Some(current) = timestamp else {
            return;
        };
        if let Some(previous) = self.previous_ts {
            // Equal timestamps are not a violation.
            if current < previous {
                self.stats.anomalies.timestamp_order += 1;
                self.stats
                    .examples
                    .timestamp_order
                    .push(OrderViolation { previous, current });
            }
        }
        self.previous_ts = Some(current);
    }

    fn check_velocity(&mut self, timestamp: Option<f64>, data: &Map<String, Value>) {
        let Some(velocity) = data.get("velocity").and_then(coerce_number) else {
            return;
        };
        if velocity > EXTREME_VELOCITY_THRESHOLD {
            self.stats.anomalies.extreme_velocity += 1;
            self.stats
                .examples
                .extreme_velocity
                .push(VelocitySpike {
                    timestamp,
                    velocity,
                });
        }
    }

    fn check_key_timing(&mut self, data: &Map<String, Value>) {
        for (key, field) in [
            ("dwell_time", TimingField::DwellTime),
            ("flight_time", TimingField::FlightTime),
        ] {
            if let Some(value) = data.get(key).and_then(coerce_number) {
                if value < 0.0 {
                    self.stats.anomalies.negative_dwell_or_flight += 1;
                    self.stats
                        .examples
                        .negative_dwell_or_flight
                        .push(NegativeTiming { field, value });
                }
            }
        }
    }

    fn finish(self) -> AnalysisStats {
        self.stats
    }
}

/// Permissive numeric coercion.
///
/// Numbers pass through, booleans become 1/0 and numeric strings are parsed.
/// Numbers beyond the `f64` range saturate to infinity. Everything else (null,
/// objects, arrays, other strings) has no value.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().or_else(|| n.to_string().parse().ok()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

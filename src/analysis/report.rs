//! Human-readable rendering of [`AnalysisStats`].

use crate::analysis::analyzer::{AnalysisStats, EXTREME_VELOCITY_THRESHOLD};
use crate::collector::types::{KEY_PRESS, KEY_RELEASE, MOUSE_CLICK, MOUSE_MOVE, MOUSE_SCROLL};
use std::fmt::Write;

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:?}"),
        None => "none".to_string(),
    }
}

/// Render the analysis report.
///
/// Only the first example of each anomaly kind is shown.
pub fn render_report(stats: &AnalysisStats) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "=== FlowState Log Analysis ===");
    let _ = writeln!(out, "Total lines: {}", stats.total_lines);
    let _ = writeln!(
        out,
        "Valid JSON: {} | Invalid JSON: {}",
        stats.valid_json, stats.invalid_json
    );
    let _ = writeln!(
        out,
        "Event counts -> key_press: {}, key_release: {}, mouse_move: {}, mouse_click: {}, mouse_scroll: {}, other: {}",
        stats.count(KEY_PRESS),
        stats.count(KEY_RELEASE),
        stats.count(MOUSE_MOVE),
        stats.count(MOUSE_CLICK),
        stats.count(MOUSE_SCROLL),
        stats.other_total()
    );

    let novel: Vec<String> = stats
        .novel_types()
        .map(|(name, count)| format!("{name}: {count}"))
        .collect();
    if !novel.is_empty() {
        let _ = writeln!(out, "  Unrecognized types -> {}", novel.join(", "));
    }

    let anomalies = &stats.anomalies;
    let _ = writeln!(out, "Anomalies:");
    let _ = writeln!(
        out,
        "- Timestamp order violations: {}",
        anomalies.timestamp_order
    );
    let _ = writeln!(
        out,
        "- Extreme velocity (> {EXTREME_VELOCITY_THRESHOLD} px/s): {}",
        anomalies.extreme_velocity
    );
    let _ = writeln!(
        out,
        "- Negative dwell/flight times: {}",
        anomalies.negative_dwell_or_flight
    );

    let examples = &stats.examples;
    if let Some(spike) = examples.extreme_velocity.first() {
        let _ = writeln!(
            out,
            "  Example extreme velocity -> ts: {}, velocity: {:?}",
            number(spike.timestamp),
            spike.velocity
        );
    }
    if let Some(timing) = examples.negative_dwell_or_flight.first() {
        let _ = writeln!(
            out,
            "  Example negative timing -> {}: {:?}",
            timing.field, timing.value
        );
    }
    if let Some(order) = examples.timestamp_order.first() {
        let _ = writeln!(
            out,
            "  Example timestamp order violation -> prev: {:?}, current: {:?}",
            order.previous, order.current
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::analyze_reader;

    #[test]
    fn test_report_shows_counts_and_first_examples() {
        let log = "{\"timestamp\":1,\"event_type\":\"mouse_move\",\"data\":{\"velocity\":60000}}\n\
                   {\"timestamp\":3,\"event_type\":\"mouse_move\",\"data\":{\"velocity\":70000}}\n\
                   {\"timestamp\":0.5,\"event_type\":\"mouse_click\",\"data\":{}}\n\
                   {\"event_type\":\"gaze\",\"data\":{}}\n\
                   garbage\n";
        let stats = analyze_reader(log.as_bytes()).unwrap();
        let report = render_report(&stats);

        assert!(report.contains("Total lines: 5"));
        assert!(report.contains("Valid JSON: 4 | Invalid JSON: 1"));
        assert!(report.contains("mouse_move: 2, mouse_click: 1, mouse_scroll: 0, other: 1"));
        assert!(report.contains("Unrecognized types -> gaze: 1"));
        assert!(report.contains("Extreme velocity (> 50000 px/s): 2"));
        assert!(report.contains("Example extreme velocity -> ts: 1.0, velocity: 60000.0"));
        assert!(!report.contains("70000"));
        assert!(report.contains("prev: 3.0, current: 0.5"));
        assert!(!report.contains("Example negative timing"));
    }

    #[test]
    fn test_report_renders_missing_timestamp() {
        let stats = analyze_reader(
            "{\"event_type\":\"mouse_move\",\"data\":{\"velocity\":99999}}".as_bytes(),
        )
        .unwrap();
        assert!(render_report(&stats).contains("ts: none, velocity: 99999.0"));
    }
}

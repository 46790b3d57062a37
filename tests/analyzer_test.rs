//! Integration tests for the session log analyzer.

use flowstate_sensor::analysis::{
    analyze_log, render_report, AnalysisError, NegativeTiming, OrderViolation, TimingField,
    VelocitySpike,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn write_log(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("session.json");
    std::fs::write(&path, content).expect("Failed to write log");
    path
}

#[test]
fn test_velocity_and_order_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        "{\"timestamp\":1,\"event_type\":\"mouse_move\",\"data\":{\"velocity\":60000}}\n\
         {\"timestamp\":0.5,\"event_type\":\"mouse_click\",\"data\":{}}\n",
    );

    let stats = analyze_log(&path).unwrap();

    assert_eq!(stats.anomalies.extreme_velocity, 1);
    assert_eq!(
        stats.examples.extreme_velocity,
        vec![VelocitySpike {
            timestamp: Some(1.0),
            velocity: 60000.0
        }]
    );
    assert_eq!(stats.anomalies.timestamp_order, 1);
    assert_eq!(
        stats.examples.timestamp_order,
        vec![OrderViolation {
            previous: 1.0,
            current: 0.5
        }]
    );
    assert_eq!(stats.anomalies.negative_dwell_or_flight, 0);
}

#[test]
fn test_double_negative_timing_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        "{\"event_type\":\"key_release\",\"data\":{\"dwell_time\":-3,\"flight_time\":-1}}",
    );

    let stats = analyze_log(&path).unwrap();

    assert_eq!(stats.anomalies.negative_dwell_or_flight, 2);
    assert_eq!(
        stats.examples.negative_dwell_or_flight,
        vec![
            NegativeTiming {
                field: TimingField::DwellTime,
                value: -3.0
            },
            NegativeTiming {
                field: TimingField::FlightTime,
                value: -1.0
            },
        ]
    );
    assert_eq!(stats.count("key_release"), 1);

    let report = render_report(&stats);
    assert!(report.contains("Example negative timing -> dwell_time: -3.0"));
    assert!(!report.contains("flight_time: -1.0"));
}

#[test]
fn test_invalid_line_is_counted_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        "{\"timestamp\":10,\"event_type\":\"key_press\",\"data\":{}}\n\
         not valid json\n\
         {\"timestamp\":11,\"event_type\":\"key_release\",\"data\":{\"dwell_time\":1}}\n",
    );

    let stats = analyze_log(&path).unwrap();

    assert_eq!(stats.total_lines, 3);
    assert_eq!(stats.invalid_json, 1);
    assert_eq!(stats.valid_json, 2);
    assert_eq!(stats.anomalies.timestamp_order, 0);
    assert_eq!(stats.anomalies.extreme_velocity, 0);
    assert_eq!(stats.anomalies.negative_dwell_or_flight, 0);
    assert_eq!(stats.count("key_press"), 1);
    assert_eq!(stats.count("key_release"), 1);
}

#[test]
fn test_line_accounting_holds_for_mixed_content() {
    let dir = tempfile::tempdir().unwrap();
    let lines = [
        "",
        "{\"timestamp\":1,\"event_type\":\"mouse_scroll\",\"data\":{\"dx\":0,\"dy\":1}}",
        "   ",
        "{\"timestamp\":",
        "null",
        "\"just a string\"",
        "{}",
        "}{",
        "\t",
    ];
    let path = write_log(&dir, &lines.join("\n"));

    let stats = analyze_log(&path).unwrap();

    assert_eq!(stats.total_lines, lines.len() as u64);
    assert_eq!(stats.blank_lines, 3);
    assert_eq!(
        stats.valid_json + stats.invalid_json,
        stats.total_lines - stats.blank_lines
    );
    assert_eq!(stats.valid_json, 4);
    assert_eq!(stats.invalid_json, 2);
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = analyze_log(&dir.path().join("missing.json"));
    assert!(matches!(result, Err(AnalysisError::NotFound(_))));
}

#[test]
fn test_stats_serialize_for_tooling() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, "{\"timestamp\":2,\"event_type\":\"gaze\",\"data\":{}}\n");

    let stats = analyze_log(&path).unwrap();
    let value = serde_json::to_value(&stats).unwrap();

    assert_eq!(value["total_lines"], 1);
    assert_eq!(value["event_counts"]["gaze"], 1);
    assert_eq!(value["event_counts"]["other"], 0);
    assert_eq!(value["anomalies"]["timestamp_order"], 0);
    assert!(value["examples"]["extreme_velocity"].as_array().unwrap().is_empty());
}

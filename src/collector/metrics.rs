//! Derived timing metrics for captured input.
//!
//! Each handler takes the callback time explicitly and returns the fully
//! formed [`Event`]. Keyboard and mouse state are kept in separate structs so
//! the two device streams never contend for the same lock.

use crate::collector::hook::{Key, MouseButton};
use crate::collector::types::{
    Event, EventPayload, KeyPressData, KeyReleaseData, MouseClickData, MouseMoveData,
    MouseScrollData,
};
use chrono::Utc;
use std::collections::HashMap;

/// Moves closer together than this (in seconds) may be throttled.
pub const MOVE_THROTTLE_SECS: f64 = 0.1;

/// Moves shorter than this (in pixels) may be throttled.
pub const MOVE_THROTTLE_DISTANCE: f64 = 5.0;

/// Identity used when a key cannot be described.
pub const UNKNOWN_KEY: &str = "unknown";

/// Current wall-clock time in seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1_000_000_000.0
}

/// String identity of a key.
///
/// Printable characters map to themselves, named keys to `Key.<name>`, raw
/// codes to `<code>`. Anything else becomes [`UNKNOWN_KEY`].
pub fn key_identity(key: &Key) -> String {
    match key {
        Key::Char(c) if !c.is_control() => c.to_string(),
        Key::Named(name) if !name.trim().is_empty() => format!("Key.{}", name.trim()),
        Key::Code(code) => format!("<{code}>"),
        _ => UNKNOWN_KEY.to_string(),
    }
}

/// Press/release bookkeeping for flight and dwell times.
#[derive(Debug, Default)]
pub struct KeyTiming {
    press_times: HashMap<String, f64>,
    last_release: Option<f64>,
}

impl KeyTiming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press and build its event.
    ///
    /// Flight time is measured from the last release of any key.
    pub fn press(&mut self, now: f64, key: &str) -> Event {
        let flight_time = self.last_release.map(|released| now - released);
        self.press_times.insert(key.to_string(), now);

        Event::new(
            now,
            EventPayload::KeyPress(KeyPressData {
                key: key.to_string(),
                press_time: now,
                flight_time,
            }),
        )
    }

    /// Record a release and build its event.
    ///
    /// Dwell time is only known when an unmatched press for the same key exists.
    pub fn release(&mut self, now: f64, key: &str) -> Event {
        let press_time = self.press_times.remove(key);
        let dwell_time = press_time.map(|pressed| now - pressed);
        self.last_release = Some(now);

        Event::new(
            now,
            EventPayload::KeyRelease(KeyReleaseData {
                key: key.to_string(),
                press_time,
                release_time: now,
                dwell_time,
            }),
        )
    }

    /// Number of keys currently held down.
    pub fn pending_presses(&self) -> usize {
        self.press_times.len()
    }
}

/// Last accepted pointer position and click time.
#[derive(Debug, Default)]
pub struct MouseState {
    last_pos: Option<(i32, i32)>,
    last_move_time: Option<f64>,
    last_click_time: Option<f64>,
}

impl MouseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a move event, or `None` when the move is throttled.
    ///
    /// A move is throttled only when it is both quick (`dt < 0.1s`) and short
    /// (`distance < 5px`). Throttled moves leave the state untouched so the
    /// next move is measured from the last accepted one.
    pub fn movement(&mut self, now: f64, x: i32, y: i32) -> Option<Event> {
        let mut velocity = None;

        if let (Some((last_x, last_y)), Some(last_time)) = (self.last_pos, self.last_move_time) {
            let dx = f64::from(x) - f64::from(last_x);
            let dy = f64::from(y) - f64::from(last_y);
            let distance = dx.hypot(dy);
            let dt = now - last_time;

            if dt < MOVE_THROTTLE_SECS && distance < MOVE_THROTTLE_DISTANCE {
                return None;
            }
            velocity = (dt > 0.0).then(|| distance / dt);
        }

        self.last_pos = Some((x, y));
        self.last_move_time = Some(now);

        Some(Event::new(
            now,
            EventPayload::MouseMove(MouseMoveData { x, y, velocity }),
        ))
    }

    /// Build a click event. Both press and release callbacks count as clicks.
    pub fn click(&mut self, now: f64, x: i32, y: i32, button: MouseButton, pressed: bool) -> Event {
        let click_interval = self.last_click_time.map(|last| now - last);
        self.last_click_time = Some(now);

        Event::new(
            now,
            EventPayload::MouseClick(MouseClickData {
                x,
                y,
                button: button.as_wire().to_string(),
                pressed,
                click_interval,
            }),
        )
    }

    /// Build a scroll event. Scrolls carry raw deltas only.
    pub fn scroll(now: f64, x: i32, y: i32, dx: i32, dy: i32) -> Event {
        Event::new(
            now,
            EventPayload::MouseScroll(MouseScrollData { x, y, dx, dy }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_velocity(event: &Event) -> Option<f64> {
        match &event.payload {
            EventPayload::MouseMove(data) => data.velocity,
            other => panic!("expected mouse move, got {other:?}"),
        }
    }

    #[test]
    fn test_key_identity() {
        assert_eq!(key_identity(&Key::Char('a')), "a");
        assert_eq!(key_identity(&Key::Char('\u{8}')), UNKNOWN_KEY);
        assert_eq!(key_identity(&Key::Named("shift".into())), "Key.shift");
        assert_eq!(key_identity(&Key::Named("  ".into())), UNKNOWN_KEY);
        assert_eq!(key_identity(&Key::Code(65)), "<65>");
        assert_eq!(key_identity(&Key::Unidentified), UNKNOWN_KEY);
    }

    #[test]
    fn test_flight_time_requires_prior_release() {
        let mut keys = KeyTiming::new();

        let first = keys.press(1.0, "a");
        match first.payload {
            EventPayload::KeyPress(ref d) => assert_eq!(d.flight_time, None),
            _ => unreachable!(),
        }

        keys.release(1.2, "a");
        // Flight time is measured from any key's release.
        match keys.press(1.5, "b").payload {
            EventPayload::KeyPress(d) => {
                assert!((d.flight_time.unwrap() - 0.3).abs() < 1e-9);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_dwell_time_requires_matching_press() {
        let mut keys = KeyTiming::new();

        match keys.release(2.0, "x").payload {
            EventPayload::KeyRelease(d) => {
                assert_eq!(d.press_time, None);
                assert_eq!(d.dwell_time, None);
            }
            _ => unreachable!(),
        }

        keys.press(3.0, "x");
        assert_eq!(keys.pending_presses(), 1);
        match keys.release(3.25, "x").payload {
            EventPayload::KeyRelease(d) => {
                assert_eq!(d.press_time, Some(3.0));
                assert_eq!(d.dwell_time, Some(0.25));
            }
            _ => unreachable!(),
        }
        assert_eq!(keys.pending_presses(), 0);

        // The press was consumed by the first release.
        match keys.release(4.0, "x").payload {
            EventPayload::KeyRelease(d) => assert_eq!(d.dwell_time, None),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_first_move_has_no_velocity() {
        let mut mouse = MouseState::new();
        let event = mouse.movement(1.0, 10, 10).unwrap();
        assert_eq!(move_velocity(&event), None);
    }

    #[test]
    fn test_move_throttle_needs_both_conditions() {
        let mut mouse = MouseState::new();
        mouse.movement(1.0, 0, 0).unwrap();

        // quick and short: suppressed
        assert!(mouse.movement(1.05, 3, 0).is_none());

        // quick but long: emitted
        let jump = mouse.movement(1.01, 3, 4).unwrap();
        assert!((move_velocity(&jump).unwrap() - 500.0).abs() < 1e-6);

        // short but slow: emitted
        let slow = mouse.movement(1.21, 4, 4).unwrap();
        assert!((move_velocity(&slow).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_suppressed_move_keeps_previous_reference() {
        let mut mouse = MouseState::new();
        mouse.movement(1.0, 0, 0).unwrap();
        assert!(mouse.movement(1.05, 4, 0).is_none());

        // Measured from (0,0) at t=1.0, not from the suppressed move.
        let event = mouse.movement(1.08, 6, 0).unwrap();
        assert!((move_velocity(&event).unwrap() - 75.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_dt_long_move_has_no_velocity() {
        let mut mouse = MouseState::new();
        mouse.movement(1.0, 0, 0).unwrap();
        let event = mouse.movement(1.0, 100, 0).unwrap();
        assert_eq!(move_velocity(&event), None);
    }

    #[test]
    fn test_click_interval() {
        let mut mouse = MouseState::new();
        match mouse.click(1.0, 5, 5, MouseButton::Left, true).payload {
            EventPayload::MouseClick(d) => {
                assert_eq!(d.click_interval, None);
                assert_eq!(d.button, "Button.left");
            }
            _ => unreachable!(),
        }
        match mouse.click(1.5, 5, 5, MouseButton::Left, false).payload {
            EventPayload::MouseClick(d) => {
                assert_eq!(d.click_interval, Some(0.5));
                assert!(!d.pressed);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_now_secs_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_secs() > 1_577_836_800.0);
    }
}

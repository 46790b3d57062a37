//! Event types written to and read back from session logs.
//!
//! Every event is persisted as one JSON object per line:
//!
//! ```text
//! {"timestamp": 1700000000.25, "event_type": "key_press", "data": {...}}
//! ```
//!
//! In memory the `event_type`/`data` pair is a tagged enum so each kind carries
//! its own strongly-typed payload. Event types this crate does not know about
//! are kept as [`EventPayload::Other`] with their raw `data` mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire label for key press events.
pub const KEY_PRESS: &str = "key_press";
/// Wire label for key release events.
pub const KEY_RELEASE: &str = "key_release";
/// Wire label for mouse move events.
pub const MOUSE_MOVE: &str = "mouse_move";
/// Wire label for mouse click events.
pub const MOUSE_CLICK: &str = "mouse_click";
/// Wire label for mouse scroll events.
pub const MOUSE_SCROLL: &str = "mouse_scroll";

/// Payload of a key press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPressData {
    /// Key identity (printable character or symbolic name)
    pub key: String,
    pub press_time: f64,
    /// Time since the most recent release of any key
    pub flight_time: Option<f64>,
}

/// Payload of a key release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyReleaseData {
    pub key: String,
    /// Matching press timestamp, if the press was observed
    pub press_time: Option<f64>,
    pub release_time: f64,
    /// How long the key was held down
    pub dwell_time: Option<f64>,
}

/// Payload of a mouse move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseMoveData {
    pub x: i32,
    pub y: i32,
    /// Pixels per second since the last accepted move
    pub velocity: Option<f64>,
}

/// Payload of a mouse button press or release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseClickData {
    pub x: i32,
    pub y: i32,
    pub button: String,
    pub pressed: bool,
    /// Time since the previous click callback
    pub click_interval: Option<f64>,
}

/// Payload of a scroll wheel movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseScrollData {
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
}

/// Type-specific part of an [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    KeyPress(KeyPressData),
    KeyRelease(KeyReleaseData),
    MouseMove(MouseMoveData),
    MouseClick(MouseClickData),
    MouseScroll(MouseScrollData),
    /// An event type this crate does not recognise.
    Other {
        event_type: String,
        data: Map<String, Value>,
    },
}

impl EventPayload {
    /// The `event_type` label used on the wire.
    pub fn event_type(&self) -> &str {
        match self {
            EventPayload::KeyPress(_) => KEY_PRESS,
            EventPayload::KeyRelease(_) => KEY_RELEASE,
            EventPayload::MouseMove(_) => MOUSE_MOVE,
            EventPayload::MouseClick(_) => MOUSE_CLICK,
            EventPayload::MouseScroll(_) => MOUSE_SCROLL,
            EventPayload::Other { event_type, .. } => event_type,
        }
    }

    /// Whether this payload came from the keyboard stream.
    pub fn is_keyboard(&self) -> bool {
        matches!(self, EventPayload::KeyPress(_) | EventPayload::KeyRelease(_))
    }
}

/// A single captured input event.
///
/// Events are created once at capture time and never mutated after they are
/// handed to the writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "EventRecord", try_from = "EventRecord")]
pub struct Event {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(timestamp: f64, payload: EventPayload) -> Self {
        Self { timestamp, payload }
    }

    pub fn event_type(&self) -> &str {
        self.payload.event_type()
    }
}

/// Flat wire shape of an [`Event`].
#[derive(Serialize, Deserialize)]
struct EventRecord {
    timestamp: f64,
    event_type: String,
    #[serde(default)]
    data: Value,
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        let event_type = event.event_type().to_string();
        // Payload structs only hold numbers, strings and bools, so conversion cannot fail.
        let data = match event.payload {
            EventPayload::KeyPress(d) => serde_json::to_value(d),
            EventPayload::KeyRelease(d) => serde_json::to_value(d),
            EventPayload::MouseMove(d) => serde_json::to_value(d),
            EventPayload::MouseClick(d) => serde_json::to_value(d),
            EventPayload::MouseScroll(d) => serde_json::to_value(d),
            EventPayload::Other { data, .. } => Ok(Value::Object(data)),
        }
        .unwrap_or(Value::Null);

        Self {
            timestamp: event.timestamp,
            event_type,
            data,
        }
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = serde_json::Error;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let EventRecord {
            timestamp,
            event_type,
            data,
        } = record;
        let payload = match event_type.as_str() {
            KEY_PRESS => EventPayload::KeyPress(serde_json::from_value(data)?),
            KEY_RELEASE => EventPayload::KeyRelease(serde_json::from_value(data)?),
            MOUSE_MOVE => EventPayload::MouseMove(serde_json::from_value(data)?),
            MOUSE_CLICK => EventPayload::MouseClick(serde_json::from_value(data)?),
            MOUSE_SCROLL => EventPayload::MouseScroll(serde_json::from_value(data)?),
            _ => EventPayload::Other {
                data: match data {
                    Value::Null => Map::new(),
                    other => serde_json::from_value(other)?,
                },
                event_type: event_type.clone(),
            },
        };

        Ok(Event { timestamp, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_press_wire_shape() {
        let event = Event::new(
            10.5,
            EventPayload::KeyPress(KeyPressData {
                key: "a".to_string(),
                press_time: 10.5,
                flight_time: None,
            }),
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "timestamp": 10.5,
                "event_type": "key_press",
                "data": {"key": "a", "press_time": 10.5, "flight_time": null}
            })
        );
    }

    #[test]
    fn test_unknown_type_decodes_as_other() {
        let event: Event = serde_json::from_str(
            r#"{"timestamp": 3.0, "event_type": "gaze", "data": {"x": 1}}"#,
        )
        .unwrap();

        assert_eq!(event.event_type(), "gaze");
        match &event.payload {
            EventPayload::Other { data, .. } => assert_eq!(data.get("x"), Some(&json!(1))),
            other => panic!("expected Other, got {other:?}"),
        }
        assert!(!event.payload.is_keyboard());

        let line = serde_json::to_string(&event).unwrap();
        assert!(line.contains(r#""event_type":"gaze""#));
    }

    #[test]
    fn test_known_type_with_wrong_shape_is_rejected() {
        let result: Result<Event, _> = serde_json::from_str(
            r#"{"timestamp": 1.0, "event_type": "mouse_move", "data": {"x": "left"}}"#,
        );
        assert!(result.is_err());
    }
}

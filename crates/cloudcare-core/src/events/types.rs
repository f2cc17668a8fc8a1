//! Event and frame types for the emergency alert stream.
//!
//! - `EmergencyEvent` - opaque JSON mapping describing an alert change
//! - `AlertEventKind` - the tag written into the `event` key of an event
//! - `StreamFrame` - what a subscriber hands to the streaming transport

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{CoreError, Result};
use crate::time::{Timestamp, now_rfc3339};

/// SSE event name for frames carrying an emergency event.
pub const ALERT_FRAME: &str = "emergency_alert";

/// SSE event name for keepalive frames.
pub const PING_FRAME: &str = "ping";

// ============================================================================
// Emergency Events
// ============================================================================

/// Tag describing which alert change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertEventKind {
    AlertCreated,
    AlertAcknowledged,
    AlertResponding,
    AlertResolved,
    FalseAlarm,
}

impl AlertEventKind {
    /// Returns the string representation of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertEventKind::AlertCreated => "alert_created",
            AlertEventKind::AlertAcknowledged => "alert_acknowledged",
            AlertEventKind::AlertResponding => "alert_responding",
            AlertEventKind::AlertResolved => "alert_resolved",
            AlertEventKind::FalseAlarm => "false_alarm",
        }
    }
}

impl std::fmt::Display for AlertEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable emergency event.
///
/// The payload is passed through to subscribers verbatim; the broadcaster
/// never inspects it. Serializes as the bare JSON object it wraps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmergencyEvent(Map<String, Value>);

impl EmergencyEvent {
    pub fn from_map(payload: Map<String, Value>) -> Self {
        Self(payload)
    }

    /// Event announcing a newly raised alert.
    ///
    /// `details` carries the alert fields (patient, severity, location...);
    /// the `event` tag is added unless `details` already sets one.
    pub fn alert_created(alert_id: impl Into<String>, details: Map<String, Value>) -> Self {
        let mut payload = details;
        payload
            .entry("event")
            .or_insert_with(|| Value::from(AlertEventKind::AlertCreated.as_str()));
        payload.insert("alert_id".into(), Value::String(alert_id.into()));
        payload
            .entry("timestamp")
            .or_insert_with(|| Value::String(now_rfc3339()));
        Self(payload)
    }

    /// Event announcing a status transition of an existing alert.
    pub fn status_changed(
        kind: AlertEventKind,
        alert_id: impl Into<String>,
        responder_id: Option<&str>,
    ) -> Self {
        let mut payload = Map::new();
        payload.insert("event".into(), Value::from(kind.as_str()));
        payload.insert("alert_id".into(), Value::String(alert_id.into()));
        if matches!(
            kind,
            AlertEventKind::AlertAcknowledged | AlertEventKind::AlertResponding
        ) {
            payload.insert(
                "responder_id".into(),
                responder_id.map_or(Value::Null, Value::from),
            );
        }
        payload.insert("timestamp".into(), Value::String(now_rfc3339()));
        Self(payload)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn alert_id(&self) -> Option<&str> {
        self.0.get("alert_id").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Value> for EmergencyEvent {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::invalid_event(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

impl From<EmergencyEvent> for Value {
    fn from(event: EmergencyEvent) -> Self {
        Value::Object(event.0)
    }
}

// ============================================================================
// Stream Frames
// ============================================================================

/// One frame produced by a subscriber for its streaming connection.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// The next event pulled from the delivery queue.
    Alert(EmergencyEvent),
    /// Keepalive emitted when nothing arrived within the keepalive window.
    Ping { timestamp: Timestamp },
}

impl StreamFrame {
    pub fn ping() -> Self {
        StreamFrame::Ping {
            timestamp: Timestamp::now(),
        }
    }

    /// SSE `event:` label for this frame.
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamFrame::Alert(_) => ALERT_FRAME,
            StreamFrame::Ping { .. } => PING_FRAME,
        }
    }

    /// JSON payload for the SSE `data:` field.
    pub fn data(&self) -> Result<String> {
        let encoded = match self {
            StreamFrame::Alert(event) => serde_json::to_string(event)?,
            StreamFrame::Ping { timestamp } => {
                serde_json::to_string(&json!({ "timestamp": timestamp.to_rfc3339()? }))?
            }
        };
        Ok(encoded)
    }

    pub fn is_ping(&self) -> bool {
        matches!(self, StreamFrame::Ping { .. })
    }

    pub fn as_event(&self) -> Option<&EmergencyEvent> {
        match self {
            StreamFrame::Alert(event) => Some(event),
            StreamFrame::Ping { .. } => None,
        }
    }
}

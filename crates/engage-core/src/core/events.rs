//! Session status, stream-event translation, and bus topic names.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bus topic names used between the core and its adapters.
///
/// `stream-*` topics are published by the connector and consumed by the
/// controller; the `analysis-*`, `connection-error`, and `status-changed`
/// topics are the outbound lifecycle contract for adapters; `news-selected`
/// and `characters-selected` are the inbound selection contract.
pub mod topics {
    pub const NEWS_SELECTED: &str = "news-selected";
    pub const CHARACTERS_SELECTED: &str = "characters-selected";

    pub const STREAM_UPDATE: &str = "stream-update";
    pub const STREAM_COMPLETE: &str = "stream-complete";
    pub const STREAM_ERROR: &str = "stream-error";
    pub const CONNECTION_ERROR: &str = "connection-error";

    pub const ANALYSIS_STARTED: &str = "analysis-started";
    pub const ANALYSIS_UPDATE: &str = "analysis-update";
    pub const ANALYSIS_COMPLETE: &str = "analysis-complete";
    pub const ANALYSIS_ERROR: &str = "analysis-error";
    pub const STATUS_CHANGED: &str = "status-changed";
}

/// Lifecycle status of the (single) analysis session.
///
/// This enum is the only source of truth for "is an analysis running" —
/// there is no separate boolean flag anywhere in the core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Starting,
    Streaming,
    Complete,
    Failed,
}

impl SessionStatus {
    /// Returns the wire/display name for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Starting => "starting",
            SessionStatus::Streaming => "streaming",
            SessionStatus::Complete => "complete",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// News selection accumulated before an analysis starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsSelection {
    /// The news text to analyze.
    pub content: String,
    /// True when the operator typed the text instead of picking a scenario.
    #[serde(default)]
    pub is_custom: bool,
}

/// A unit received from the live subscription.
///
/// Payloads are opaque: partial result for `Update`, final summary for
/// `Complete`, a message for `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Update(Value),
    Complete(Value),
    Error { message: String },
}

/// Translates one SSE (event-name, data) pair into a [`StreamEvent`].
///
/// Unknown event names (keepalives and future additions) yield `None` and
/// are skipped by the connector. Update/complete data that is not valid JSON
/// is forwarded as a JSON string so the opaque-payload contract stays total.
pub fn parse_stream_event(event_name: &str, data: &str) -> Option<StreamEvent> {
    match event_name {
        "update" => Some(StreamEvent::Update(opaque_payload(data))),
        "complete" => Some(StreamEvent::Complete(opaque_payload(data))),
        "error" => Some(StreamEvent::Error {
            message: error_message(data),
        }),
        _ => None,
    }
}

fn opaque_payload(data: &str) -> Value {
    serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_string()))
}

/// Extracts a display message from an `error` event body.
///
/// Accepts `{"message": "..."}` (the backend contract) and falls back to the
/// raw data for anything else.
fn error_message(data: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(data)
        && let Some(message) = value.get("message").and_then(|v| v.as_str())
    {
        return message.to_string();
    }
    data.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_update_event() {
        let event = parse_stream_event("update", r#"{"character_id":"jovani_vazquez","take":"wow"}"#);
        assert_eq!(
            event,
            Some(StreamEvent::Update(
                json!({"character_id": "jovani_vazquez", "take": "wow"})
            ))
        );
    }

    #[test]
    fn test_parse_complete_event() {
        let event = parse_stream_event("complete", r#"{"summary":"done"}"#);
        assert_eq!(event, Some(StreamEvent::Complete(json!({"summary": "done"}))));
    }

    #[test]
    fn test_parse_error_event_with_message_field() {
        let event = parse_stream_event("error", r#"{"message":"engine crashed"}"#);
        assert_eq!(
            event,
            Some(StreamEvent::Error {
                message: "engine crashed".to_string()
            })
        );
    }

    #[test]
    fn test_parse_error_event_with_raw_body() {
        let event = parse_stream_event("error", "engine crashed");
        assert_eq!(
            event,
            Some(StreamEvent::Error {
                message: "engine crashed".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_event_names_are_skipped() {
        assert_eq!(parse_stream_event("ping", ""), None);
        assert_eq!(parse_stream_event("comment", "keepalive"), None);
    }

    #[test]
    fn test_non_json_update_payload_becomes_string() {
        let event = parse_stream_event("update", "plain text chunk");
        assert_eq!(
            event,
            Some(StreamEvent::Update(Value::String(
                "plain text chunk".to_string()
            )))
        );
    }

    #[test]
    fn test_status_round_trip() {
        let status: SessionStatus = serde_json::from_str(r#""streaming""#).unwrap();
        assert_eq!(status, SessionStatus::Streaming);
        assert_eq!(status.to_string(), "streaming");
        assert_eq!(SessionStatus::default(), SessionStatus::Idle);
    }
}

//! SSE and JSON fixture helpers for binary-level tests.

#![allow(dead_code)]

use serde_json::json;
use wiremock::ResponseTemplate;

/// Wraps an SSE body in a `text/event-stream` response.
pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

/// One `update` frame followed by one `complete` frame.
pub fn update_then_complete(update: &str, complete: &str) -> String {
    format!("event: update\ndata: {update}\n\nevent: complete\ndata: {complete}\n\n")
}

/// One `error` frame.
pub fn error_sse(data: &str) -> String {
    format!("event: error\ndata: {data}\n\n")
}

/// JSON response for the session-creation endpoint.
pub fn session_response(session_id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "session_id": session_id }))
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

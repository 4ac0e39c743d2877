//! Shared helpers for backend-mock integration tests.

#![allow(dead_code)]

use std::time::Duration;

use engage_core::bus::EventBus;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use wiremock::ResponseTemplate;

/// Wraps an SSE body in a `text/event-stream` response.
pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

/// One `update` SSE frame.
pub fn update_event(data: &str) -> String {
    format!("event: update\ndata: {data}\n\n")
}

/// One `complete` SSE frame.
pub fn complete_event(data: &str) -> String {
    format!("event: complete\ndata: {data}\n\n")
}

/// One `error` SSE frame.
pub fn error_event(data: &str) -> String {
    format!("event: error\ndata: {data}\n\n")
}

/// A whole successful stream: updates followed by a completion.
pub fn analysis_sse(updates: &[&str], complete: &str) -> String {
    let mut body = String::new();
    for update in updates {
        body.push_str(&update_event(update));
    }
    body.push_str(&complete_event(complete));
    body
}

/// JSON response for the session-creation endpoint.
pub fn session_response(session_id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "session_id": session_id }))
}

/// Records every payload published on `topic` into a channel.
///
/// The registration stays alive for the lifetime of the bus.
pub fn record_topic(bus: &EventBus, topic: &'static str) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    bus.subscribe(topic, move |payload| {
        let _ = tx.send(payload.clone());
    });
    rx
}

/// Receives the next recorded payload, failing the test after 5 seconds.
pub async fn recv_event(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for bus event")
        .expect("recorder channel closed")
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

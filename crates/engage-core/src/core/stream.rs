//! SSE connector owning the single live analysis subscription.
//!
//! The connector holds zero-or-one subscription at a time. Every connection
//! captures a generation number; messages from a superseded generation are
//! discarded before they reach the bus, which is the only correctness-
//! critical race in the system.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::USER_AGENT;
use crate::bus::EventBus;
use crate::core::events::{StreamEvent, parse_stream_event, topics};

/// Owns the live SSE subscription for the current session.
pub struct StreamConnector {
    bus: Arc<EventBus>,
    http: reqwest::Client,
    base_url: String,
    generation: Arc<AtomicU64>,
    active: Mutex<Option<CancellationToken>>,
}

impl StreamConnector {
    /// Creates a connector publishing to `bus` for streams under `base_url`.
    pub fn new(bus: Arc<EventBus>, base_url: impl Into<String>) -> Self {
        Self {
            bus,
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a subscription scoped to `session_id`, closing any existing one
    /// first. Returns immediately; messages arrive on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, session_id: &str) {
        let generation = self.close_current();
        let cancel = CancellationToken::new();
        *self.active() = Some(cancel.clone());

        let url = format!("{}/api/analysis-stream/{session_id}", self.base_url);
        let bus = Arc::clone(&self.bus);
        let current = Arc::clone(&self.generation);
        let http = self.http.clone();
        tokio::spawn(run_stream(http, url, bus, current, generation, cancel));
    }

    /// Closes the active subscription, if any.
    ///
    /// Bumps the generation counter so any already-in-flight message from
    /// the old subscription is discarded. Idempotent when already
    /// disconnected, and safe to call from inside a bus callback.
    pub fn disconnect(&self) {
        self.close_current();
    }

    /// Cancels the current reader (without joining it) and advances the
    /// generation; returns the new generation.
    fn close_current(&self) -> u64 {
        if let Some(cancel) = self.active().take() {
            cancel.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

async fn run_stream(
    http: reqwest::Client,
    url: String,
    bus: Arc<EventBus>,
    current: Arc<AtomicU64>,
    generation: u64,
    cancel: CancellationToken,
) {
    let request = http
        .get(&url)
        .header("accept", "text/event-stream")
        .header("user-agent", USER_AGENT);

    let response = tokio::select! {
        () = cancel.cancelled() => return,
        result = request.send() => result,
    };
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            publish_connection_error(
                &bus,
                &current,
                generation,
                &format!("Stream connection failed: {e}"),
            );
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        publish_connection_error(
            &bus,
            &current,
            generation,
            &format!("Stream endpoint returned HTTP {}", status.as_u16()),
        );
        return;
    }

    let mut events = response.bytes_stream().eventsource();
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return,
            item = events.next() => item,
        };
        match next {
            // EOF without a terminal event: the subscription died.
            None => {
                publish_connection_error(
                    &bus,
                    &current,
                    generation,
                    "Stream ended before completion",
                );
                return;
            }
            Some(Err(e)) => {
                publish_connection_error(
                    &bus,
                    &current,
                    generation,
                    &format!("Stream transport error: {e}"),
                );
                return;
            }
            Some(Ok(message)) => {
                if current.load(Ordering::SeqCst) != generation {
                    debug!(generation, "dropping message from superseded stream");
                    return;
                }
                match parse_stream_event(&message.event, &message.data) {
                    None => {
                        debug!(event = %message.event, "ignoring unknown stream event");
                    }
                    Some(StreamEvent::Update(payload)) => {
                        bus.publish(topics::STREAM_UPDATE, &payload);
                    }
                    Some(StreamEvent::Complete(payload)) => {
                        bus.publish(topics::STREAM_COMPLETE, &payload);
                        return;
                    }
                    Some(StreamEvent::Error { message }) => {
                        bus.publish(topics::STREAM_ERROR, &json!({ "message": message }));
                        return;
                    }
                }
            }
        }
    }
}

fn publish_connection_error(
    bus: &EventBus,
    current: &AtomicU64,
    generation: u64,
    message: &str,
) {
    if current.load(Ordering::SeqCst) != generation {
        debug!(generation, "dropping transport error from superseded stream");
        return;
    }
    bus.publish(topics::CONNECTION_ERROR, &json!({ "message": message }));
}

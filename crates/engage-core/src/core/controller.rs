//! The analysis session state machine.
//!
//! Exactly one analysis is in flight (or completed, or failed) at a time.
//! The controller validates selections, allocates the server-side session,
//! drives the stream connector, and republishes coarse lifecycle events for
//! adapters. All session state lives behind one mutex that is never held
//! across an await or a bus publish.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Value, json};
use tracing::debug;

use crate::api::ApiClient;
use crate::bus::{EventBus, Subscription};
use crate::core::events::{NewsSelection, SessionStatus, topics};
use crate::core::stream::StreamConnector;
use crate::error::{AnalysisError, AnalysisErrorKind, AnalysisResult};

#[derive(Default)]
struct SessionState {
    status: SessionStatus,
    session_id: Option<String>,
    news: Option<NewsSelection>,
    characters: Vec<String>,
}

struct ControllerInner {
    bus: Arc<EventBus>,
    api: ApiClient,
    connector: StreamConnector,
    state: Mutex<SessionState>,
}

/// Drives one analysis session at a time.
///
/// Construct one per bus and keep it alive for the lifetime of the UI; it
/// unsubscribes its bus registrations and closes any live stream on drop.
pub struct SessionController {
    inner: Arc<ControllerInner>,
    subscriptions: Vec<Subscription>,
}

impl SessionController {
    /// Creates a controller wired to `bus`, talking to the backend at
    /// `base_url`.
    pub fn new(bus: Arc<EventBus>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let inner = Arc::new(ControllerInner {
            bus: Arc::clone(&bus),
            api: ApiClient::new(base_url.clone()),
            connector: StreamConnector::new(Arc::clone(&bus), base_url),
            state: Mutex::new(SessionState::default()),
        });

        let subscriptions = vec![
            subscribe(&bus, topics::NEWS_SELECTED, &inner, ControllerInner::handle_news_selected),
            subscribe(
                &bus,
                topics::CHARACTERS_SELECTED,
                &inner,
                ControllerInner::handle_characters_selected,
            ),
            subscribe(&bus, topics::STREAM_UPDATE, &inner, ControllerInner::on_stream_update),
            subscribe(&bus, topics::STREAM_COMPLETE, &inner, ControllerInner::on_stream_complete),
            subscribe(&bus, topics::STREAM_ERROR, &inner, ControllerInner::on_stream_error),
            subscribe(&bus, topics::CONNECTION_ERROR, &inner, ControllerInner::on_connection_error),
        ];

        Self {
            inner,
            subscriptions,
        }
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        self.inner.state().status
    }

    /// Backend-assigned id of the current session, if one was allocated.
    pub fn session_id(&self) -> Option<String> {
        self.inner.state().session_id.clone()
    }

    /// News selection accumulated so far.
    pub fn selected_news(&self) -> Option<NewsSelection> {
        self.inner.state().news.clone()
    }

    /// Character selection accumulated so far.
    pub fn selected_characters(&self) -> Vec<String> {
        self.inner.state().characters.clone()
    }

    /// Records the news selection; honored only while `Idle`.
    pub fn select_news(&self, selection: NewsSelection) {
        self.inner.select_news(selection);
    }

    /// Records the character selection; honored only while `Idle`.
    pub fn select_characters(&self, character_ids: Vec<String>) {
        self.inner.select_characters(character_ids);
    }

    /// Starts an analysis session.
    ///
    /// A call while the session is not `Idle` is a no-op returning `Ok(())`,
    /// so repeated triggers never allocate a duplicate backend session.
    /// Validation failures are returned without any network call and leave
    /// the session `Idle`.
    pub async fn start(&self) -> AnalysisResult<()> {
        self.inner.start().await
    }

    /// Retries a failed session.
    ///
    /// With a retained session id the controller reconnects directly,
    /// issuing no creation request; otherwise it restarts the full creation
    /// flow. A no-op outside `Failed`.
    pub async fn retry(&self) -> AnalysisResult<()> {
        self.inner.retry().await
    }

    /// Returns the session to `Idle`, closing any live stream and clearing
    /// the session id and selections. Legal from any state.
    pub fn reset(&self) {
        self.inner.reset();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        for subscription in &self.subscriptions {
            self.inner.bus.unsubscribe(subscription);
        }
        self.inner.connector.disconnect();
    }
}

fn subscribe(
    bus: &EventBus,
    topic: &'static str,
    inner: &Arc<ControllerInner>,
    handler: fn(&ControllerInner, &Value),
) -> Subscription {
    let inner = Arc::clone(inner);
    bus.subscribe(topic, move |payload| handler(&inner, payload))
}

impl ControllerInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_status(&self, status: SessionStatus) {
        self.bus
            .publish(topics::STATUS_CHANGED, &json!({ "status": status }));
    }

    fn publish_error(&self, kind: AnalysisErrorKind, message: &str) {
        self.bus.publish(
            topics::ANALYSIS_ERROR,
            &json!({ "message": message, "kind": kind }),
        );
    }

    fn select_news(&self, selection: NewsSelection) {
        let mut state = self.state();
        if state.status != SessionStatus::Idle {
            debug!(status = %state.status, "ignoring news selection outside idle");
            return;
        }
        state.news = Some(selection);
    }

    fn select_characters(&self, character_ids: Vec<String>) {
        let mut state = self.state();
        if state.status != SessionStatus::Idle {
            debug!(status = %state.status, "ignoring character selection outside idle");
            return;
        }
        state.characters = character_ids;
    }

    fn handle_news_selected(&self, payload: &Value) {
        match serde_json::from_value::<NewsSelection>(payload.clone()) {
            Ok(selection) => self.select_news(selection),
            Err(e) => debug!("malformed news-selected payload: {e}"),
        }
    }

    fn handle_characters_selected(&self, payload: &Value) {
        match serde_json::from_value::<Vec<String>>(payload.clone()) {
            Ok(character_ids) => self.select_characters(character_ids),
            Err(e) => debug!("malformed characters-selected payload: {e}"),
        }
    }

    async fn start(&self) -> AnalysisResult<()> {
        let (news, characters) = {
            let mut state = self.state();
            if state.status != SessionStatus::Idle {
                debug!(status = %state.status, "start ignored; session already active");
                return Ok(());
            }
            let news = state
                .news
                .clone()
                .ok_or_else(|| AnalysisError::validation("Select a news item before starting"))?;
            if news.content.trim().is_empty() {
                return Err(AnalysisError::validation("News content is empty"));
            }
            if state.characters.is_empty() {
                return Err(AnalysisError::validation("Select at least one character"));
            }
            state.status = SessionStatus::Starting;
            (news, state.characters.clone())
        };
        self.publish_status(SessionStatus::Starting);

        let created = self
            .api
            .create_analysis(&news.content, &characters, news.is_custom)
            .await;

        match created {
            Err(err) => {
                let still_starting = {
                    let mut state = self.state();
                    if state.status == SessionStatus::Starting {
                        state.status = SessionStatus::Failed;
                        state.session_id = None;
                        true
                    } else {
                        false
                    }
                };
                if !still_starting {
                    debug!("session reset during creation; dropping creation error");
                    return Ok(());
                }
                self.publish_status(SessionStatus::Failed);
                self.publish_error(err.kind, &err.message);
                Err(err)
            }
            Ok(session_id) => {
                let accepted = {
                    let mut state = self.state();
                    if state.status == SessionStatus::Starting {
                        state.session_id = Some(session_id.clone());
                        state.status = SessionStatus::Streaming;
                        true
                    } else {
                        false
                    }
                };
                if !accepted {
                    // A reset raced the creation request; the late id loses.
                    debug!("session superseded during creation; discarding session id");
                    return Ok(());
                }
                self.publish_status(SessionStatus::Streaming);
                self.bus
                    .publish(topics::ANALYSIS_STARTED, &json!({ "session_id": session_id }));
                self.connector.connect(&session_id);
                Ok(())
            }
        }
    }

    async fn retry(&self) -> AnalysisResult<()> {
        let retained = {
            let mut state = self.state();
            if state.status != SessionStatus::Failed {
                debug!(status = %state.status, "retry ignored outside failed");
                return Ok(());
            }
            match state.session_id.clone() {
                Some(session_id) => {
                    state.status = SessionStatus::Streaming;
                    Some(session_id)
                }
                None => {
                    // Failure happened before a session existed; go back
                    // through the full creation flow.
                    state.status = SessionStatus::Idle;
                    None
                }
            }
        };

        match retained {
            Some(session_id) => {
                self.publish_status(SessionStatus::Streaming);
                self.connector.connect(&session_id);
                Ok(())
            }
            None => {
                self.publish_status(SessionStatus::Idle);
                self.start().await
            }
        }
    }

    fn reset(&self) {
        self.connector.disconnect();
        let changed = {
            let mut state = self.state();
            let changed = state.status != SessionStatus::Idle;
            *state = SessionState::default();
            changed
        };
        if changed {
            self.publish_status(SessionStatus::Idle);
        }
    }

    fn on_stream_update(&self, payload: &Value) {
        {
            let state = self.state();
            if state.status != SessionStatus::Streaming {
                debug!(status = %state.status, "dropping update outside streaming");
                return;
            }
        }
        self.bus.publish(topics::ANALYSIS_UPDATE, payload);
    }

    fn on_stream_complete(&self, payload: &Value) {
        {
            let mut state = self.state();
            if state.status != SessionStatus::Streaming {
                debug!(status = %state.status, "dropping completion outside streaming");
                return;
            }
            state.status = SessionStatus::Complete;
        }
        self.connector.disconnect();
        self.publish_status(SessionStatus::Complete);
        self.bus.publish(topics::ANALYSIS_COMPLETE, payload);
    }

    fn on_stream_error(&self, payload: &Value) {
        self.fail_streaming(AnalysisErrorKind::Stream, payload);
    }

    fn on_connection_error(&self, payload: &Value) {
        self.fail_streaming(AnalysisErrorKind::Transport, payload);
    }

    /// Shared failure path for backend `error` events and transport
    /// failures: keep the session id for retry, do not disconnect again.
    fn fail_streaming(&self, kind: AnalysisErrorKind, payload: &Value) {
        {
            let mut state = self.state();
            if state.status != SessionStatus::Streaming {
                debug!(status = %state.status, "dropping stream failure outside streaming");
                return;
            }
            state.status = SessionStatus::Failed;
        }
        let message = payload
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("stream failed");
        self.publish_status(SessionStatus::Failed);
        self.publish_error(kind, message);
    }
}

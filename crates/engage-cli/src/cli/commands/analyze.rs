//! Analyze command handler: the bundled bus adapter.
//!
//! Plays the role of the news picker, character picker, and results
//! renderer: it publishes selections on the bus, starts the session, and
//! renders lifecycle events to the terminal as they stream in.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use engage_core::api::ApiClient;
use engage_core::bus::EventBus;
use engage_core::config::Config;
use engage_core::core::controller::SessionController;
use engage_core::core::events::topics;
use serde_json::{Value, json};
use tokio::sync::mpsc;

pub struct AnalyzeOptions<'a> {
    pub config: &'a Config,
    pub news: Option<&'a str>,
    pub scenario: Option<&'a str>,
    pub characters: &'a str,
    pub retry_once: bool,
}

enum RenderEvent {
    Update(Value),
    Complete(Value),
    Error(String),
}

pub async fn run(options: AnalyzeOptions<'_>) -> Result<()> {
    let base_url = options.config.backend.base_url.clone();

    // Custom text comes straight from the flag; a scenario id is resolved
    // against the reference endpoint first (a load failure here is a
    // one-time error, the session state machine is never touched).
    let (content, is_custom) = match (options.news, options.scenario) {
        (Some(text), _) => (text.to_string(), true),
        (None, Some(id)) => {
            let api = ApiClient::new(base_url.clone());
            let scenarios = api.scenarios().await.context("load scenarios")?;
            let scenario = scenarios
                .into_iter()
                .find(|s| s.id == id)
                .ok_or_else(|| anyhow!("unknown scenario '{id}'"))?;
            (scenario.content, false)
        }
        (None, None) => bail!("provide --news or --scenario"),
    };

    let character_ids: Vec<String> = options
        .characters
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let bus = Arc::new(EventBus::new());
    let controller = SessionController::new(Arc::clone(&bus), base_url);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let updates_tx = tx.clone();
    bus.subscribe(topics::ANALYSIS_UPDATE, move |payload| {
        let _ = updates_tx.send(RenderEvent::Update(payload.clone()));
    });
    let complete_tx = tx.clone();
    bus.subscribe(topics::ANALYSIS_COMPLETE, move |payload| {
        let _ = complete_tx.send(RenderEvent::Complete(payload.clone()));
    });
    bus.subscribe(topics::ANALYSIS_ERROR, move |payload| {
        let message = payload
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("analysis failed")
            .to_string();
        let _ = tx.send(RenderEvent::Error(message));
    });

    // Selections travel over the bus, the same contract any adapter uses.
    bus.publish(
        topics::NEWS_SELECTED,
        &json!({ "content": content, "is_custom": is_custom }),
    );
    bus.publish(
        topics::CHARACTERS_SELECTED,
        &serde_json::to_value(&character_ids).context("encode character ids")?,
    );

    controller.start().await?;
    if let Some(session_id) = controller.session_id() {
        println!("Session {session_id} streaming...");
    }

    let mut retried = false;
    while let Some(event) = rx.recv().await {
        match event {
            RenderEvent::Update(payload) => println!("{}", render_update(&payload)),
            RenderEvent::Complete(payload) => {
                println!("Analysis complete:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload).context("render summary")?
                );
                return Ok(());
            }
            RenderEvent::Error(message) => {
                if options.retry_once && !retried {
                    retried = true;
                    eprintln!("Analysis failed: {message}; retrying");
                    controller.retry().await?;
                } else {
                    bail!("Analysis failed: {message}");
                }
            }
        }
    }
    bail!("event stream closed unexpectedly")
}

/// Renders one opaque update payload as a single line.
fn render_update(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_update_unwraps_plain_strings() {
        assert_eq!(render_update(&json!("chunk")), "chunk");
    }

    #[test]
    fn test_render_update_keeps_objects_compact() {
        assert_eq!(
            render_update(&json!({"character_id": "jovani_vazquez"})),
            r#"{"character_id":"jovani_vazquez"}"#
        );
    }
}

//! Backend REST client (reference data + session creation).
//!
//! Reference-data failures surface as one-time load errors; only the
//! creation endpoint participates in the session state machine.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Standard User-Agent header for engage API requests.
pub const USER_AGENT: &str = concat!("engage/", env!("CARGO_PKG_VERSION"));

/// A character available for engagement analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    /// Short persona blurb, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

/// A preset news scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeEngagementRequest<'a> {
    news_content: &'a str,
    character_ids: &'a [String],
    custom_news: bool,
}

#[derive(Debug, Deserialize)]
struct AnalyzeEngagementResponse {
    session_id: String,
}

/// Thin REST wrapper over the analysis backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Returns the base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the character roster.
    pub async fn characters(&self) -> AnalysisResult<Vec<Character>> {
        self.get_json("/api/characters").await
    }

    /// Fetches the preset news scenarios.
    pub async fn scenarios(&self) -> AnalysisResult<Vec<Scenario>> {
        self.get_json("/api/scenarios").await
    }

    /// Allocates a server-side analysis session.
    ///
    /// Returns the backend-assigned session id. Non-2xx responses and
    /// transport failures both map to a `Network` error.
    pub async fn create_analysis(
        &self,
        news_content: &str,
        character_ids: &[String],
        custom_news: bool,
    ) -> AnalysisResult<String> {
        let request = AnalyzeEngagementRequest {
            news_content,
            character_ids,
            custom_news,
        };
        let url = format!("{}/api/analyze-engagement", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("user-agent", USER_AGENT)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::network(format!("Creation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::http_status(status.as_u16(), &error_body));
        }

        let parsed: AnalyzeEngagementResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::network(format!("Invalid creation response: {e}")))?;
        Ok(parsed.session_id)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> AnalysisResult<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .header("user-agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| AnalysisError::network(format!("Request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::http_status(status.as_u16(), &error_body));
        }

        response
            .json()
            .await
            .map_err(|e| AnalysisError::network(format!("Invalid response from {path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_creation_request_wire_format() {
        let character_ids = vec!["jovani_vazquez".to_string()];
        let request = AnalyzeEngagementRequest {
            news_content: "Hurricane warning issued",
            character_ids: &character_ids,
            custom_news: true,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "news_content": "Hurricane warning issued",
                "character_ids": ["jovani_vazquez"],
                "custom_news": true,
            })
        );
    }

    #[test]
    fn test_creation_response_parsing() {
        let parsed: AnalyzeEngagementResponse =
            serde_json::from_str(r#"{"session_id":"sess_123","extra":"ignored"}"#).unwrap();
        assert_eq!(parsed.session_id, "sess_123");
    }

    #[test]
    fn test_character_record_tolerates_missing_persona() {
        let character: Character =
            serde_json::from_str(r#"{"id":"jovani_vazquez","name":"Jovani Vazquez"}"#).unwrap();
        assert_eq!(character.id, "jovani_vazquez");
        assert!(character.persona.is_none());
    }
}

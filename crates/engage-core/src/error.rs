//! Domain error types shared across the analysis core.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of analysis errors for consistent handling.
///
/// `Validation` never reaches the retry logic: it is caught before any
/// network call and leaves the session `Idle`. The other three all resolve
/// the session to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisErrorKind {
    /// Missing or empty selection, rejected before any network call
    Validation,
    /// Session-creation request failed (transport error or non-2xx)
    Network,
    /// Backend-reported failure delivered on the live stream
    Stream,
    /// Connection-level failure on the live stream
    Transport,
}

impl fmt::Display for AnalysisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisErrorKind::Validation => write!(f, "validation"),
            AnalysisErrorKind::Network => write!(f, "network"),
            AnalysisErrorKind::Stream => write!(f, "stream"),
            AnalysisErrorKind::Transport => write!(f, "transport"),
        }
    }
}

/// Structured error with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisError {
    /// Error category
    pub kind: AnalysisErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl AnalysisError {
    /// Creates a new error of the given kind.
    pub fn new(kind: AnalysisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error (caught locally, no network involved).
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::Validation, message)
    }

    /// Creates a network error for a failed creation request.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::Network, message)
    }

    /// Creates a stream error for a backend-reported failure.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::Stream, message)
    }

    /// Creates a transport error for a connection-level failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::Transport, message)
    }

    /// Creates a network error from an HTTP status and response body.
    ///
    /// Tries to lift a cleaner message out of a JSON `{"error": {"message"}}`
    /// body before falling back to the bare status line.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}");
        let details = if body.is_empty() {
            None
        } else {
            if let Ok(json) = serde_json::from_str::<Value>(body)
                && let Some(error_obj) = json.get("error")
                && let Some(msg) = error_obj.get("message").and_then(|v| v.as_str())
            {
                return Self {
                    kind: AnalysisErrorKind::Network,
                    message: format!("HTTP {status}: {msg}"),
                    details: Some(body.to_string()),
                };
            }
            Some(body.to_string())
        };
        Self {
            kind: AnalysisErrorKind::Network,
            message,
            details,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AnalysisError {}

/// Result type for analysis operations.
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

//! HTTP error types and upstream error-body mapping

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the HTTP layer
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The attempt did not finish within its timeout
    #[error("Request to {url} timed out [request_id: {request_id}]")]
    Timeout { url: String, request_id: Uuid },

    /// Connection or protocol failure
    #[error("Network error for {url}: {message} [request_id: {request_id}]")]
    Network {
        url: String,
        message: String,
        request_id: Uuid,
    },

    /// Upstream answered with a non-success status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Body could not be read or decoded
    #[error("Failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// Body larger than the configured cap
    #[error("Response size {size} exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    /// Every attempt of a fallback chain failed
    #[error("All {} fetch attempts failed for {url}: {}", .failures.len(), .failures.join("; "))]
    Exhausted { url: String, failures: Vec<String> },

    /// The underlying client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl HttpError {
    /// Map a reqwest send/read failure for `url`
    pub fn from_reqwest(err: reqwest::Error, url: &str, request_id: Uuid) -> Self {
        if err.is_timeout() {
            HttpError::Timeout {
                url: url.to_string(),
                request_id,
            }
        } else if err.is_connect() {
            HttpError::Network {
                url: url.to_string(),
                message: format!("Connection failed: {}", err),
                request_id,
            }
        } else {
            HttpError::Network {
                url: url.to_string(),
                message: err.to_string(),
                request_id,
            }
        }
    }

    /// HTTP status code, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Map a non-success status and its (possibly unreadable) body to an error
pub fn map_http_error(status: StatusCode, body: Option<&str>) -> HttpError {
    let message = body
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_message(&v))
        .unwrap_or_else(|| default_status_message(status));

    HttpError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Message used when the error body carries nothing readable
pub fn default_status_message(status: StatusCode) -> String {
    format!("Request failed with status {}", status.as_u16())
}

/// Extract a human-readable message from a JSON error body
pub fn extract_error_message(json: &Value) -> Option<String> {
    // OpenAI format: { "error": { "message": "...", "type": "...", "code": "..." } }
    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
    {
        return Some(message.to_string());
    }

    // Generic format: { "message": "..." }
    if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
        return Some(message.to_string());
    }

    // Bare string: { "error": "..." }
    json.get("error")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

//! Chat client errors

use crate::http::HttpError;
use thiserror::Error;

/// Errors surfaced by [`ChatClient`](crate::chat::ChatClient)
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// The endpoint answered with a non-success status
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// A complete response body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The streaming body broke off mid-way
    #[error("Stream interrupted: {0}")]
    Stream(String),

    /// An image request returned no image; `raw` holds the start of the body
    #[error("No image in response")]
    NoImage { raw: String },
}

impl ChatError {
    /// HTTP status for upstream errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<HttpError> for ChatError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { status, message } => ChatError::Upstream { status, message },
            HttpError::Parse { message, .. } => ChatError::InvalidResponse(message),
            other => ChatError::Transport(other.to_string()),
        }
    }
}

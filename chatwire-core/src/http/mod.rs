//! Outbound HTTP for chat completions and search sources
//!
//! One pooled [`HttpClient`] is shared by everything; each call carries its
//! own timeout and request ID in [`RequestOptions`]. Non-2xx bodies are
//! mapped to [`HttpError`] here, and scraped pages go through [`ProxyChain`].

pub mod client;
pub mod error;
pub mod proxy;

pub use client::HttpClient;
pub use error::HttpError;
pub use proxy::{FetchOutcome, ProxyChain, ProxyEndpoint};

use std::time::Duration;
use uuid::Uuid;

/// Options for a single HTTP attempt
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Timeout for this attempt
    pub timeout: Duration,
}

/// Timeout for requests that do not set their own
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

impl RequestOptions {
    /// Options with a fresh request ID
    pub fn new(timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout,
        }
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPT_TIMEOUT)
    }
}

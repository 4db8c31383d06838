//! Chatwire Core Library
//!
//! Streaming chat completion decoding and multi-source information lookup.
//!
//! - [`chat`]: sends a conversation and yields the answer as text fragments
//! - [`stream`]: incremental framing and provider-agnostic content extraction
//! - [`search`]: intent routing, direct answers and concurrent source fan-out
//! - [`http`]: pooled client, upstream error mapping and the proxy chain
//! - [`config`]: file-based configuration with environment interpolation

pub mod chat;
pub mod config;
pub mod http;
pub mod protocol;
pub mod search;
pub mod stream;

pub use chat::{ChatClient, ChatError};
pub use config::{ChatwireConfig, ConfigError};
pub use http::{FetchOutcome, HttpError, ProxyChain, ProxyEndpoint};
pub use protocol::{ChatMessage, ImagePayload, StreamOptions};
pub use search::{InfoService, Intent, SearchAggregator, SearchResponse, SearchResult};
pub use stream::{FragmentStream, StreamingPolicy};

/// Returns the version of the Chatwire Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}

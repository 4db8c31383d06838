//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::http::ProxyEndpoint;
use serde::{Deserialize, Serialize};

/// Supported configuration schema version
pub const CONFIG_VERSION: &str = "0.1";

/// Root configuration structure for Chatwire
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatwireConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Chat completion endpoint settings
    pub chat: ChatConfig,

    /// Image generation settings
    #[serde(default)]
    pub image: ImageConfig,

    /// Streaming transport policy
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Page fetching and proxy fallback
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Information lookup settings
    #[serde(default)]
    pub search: SearchConfig,
}

/// Chat completion endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Base URL of the OpenAI-compatible API (e.g. "https://host/v1")
    pub base_url: String,

    /// API key (supports environment variable interpolation)
    pub api_key: SecretString,

    /// Model identifier used when a request does not name one
    pub model: String,

    /// System instruction prepended to every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Number of prior exchanges kept in the request; 0 keeps everything
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Request timeout in seconds (covers the whole streamed body)
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

/// Image generation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Separate base URL for image requests; falls back to `chat.base_url`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model used for image generation and editing
    #[serde(default = "default_image_model")]
    pub model: String,
}

/// Streaming transport policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingConfig {
    /// Model id substrings whose streamed output is known to lose its head
    #[serde(default = "default_non_streaming_markers")]
    pub non_streaming_markers: Vec<String>,
}

/// Fetcher and proxy chain configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Timeout for each individual attempt, in seconds
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Try the target URL directly before any proxy
    #[serde(default = "default_true")]
    pub direct_first: bool,

    /// User agent override for every outgoing request
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Ordered proxy endpoints
    #[serde(default = "default_proxies")]
    pub proxies: Vec<ProxyEndpoint>,
}

/// Information lookup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Result cap used when the caller does not pass one
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    /// Timeout for each individual source, in seconds
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,

    /// Number of top results whose pages are re-fetched for content
    #[serde(default)]
    pub enrich_top: usize,

    /// Source endpoints
    #[serde(default)]
    pub endpoints: SourceEndpoints,
}

/// Base URLs of every public data source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceEndpoints {
    pub instant_answer: String,
    pub web_html: String,
    pub encyclopedia: String,
    pub tech_news: String,
    pub programming_qa: String,
    pub social: String,
    pub weather: String,
    pub exchange_rates: String,
    pub world_time: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            instant_answer: "https://api.duckduckgo.com".to_string(),
            web_html: "https://html.duckduckgo.com/html".to_string(),
            encyclopedia: "https://en.wikipedia.org".to_string(),
            tech_news: "https://hn.algolia.com/api/v1".to_string(),
            programming_qa: "https://api.stackexchange.com/2.3".to_string(),
            social: "https://www.reddit.com".to_string(),
            weather: "https://wttr.in".to_string(),
            exchange_rates: "https://open.er-api.com/v6".to_string(),
            world_time: "https://worldtimeapi.org/api".to_string(),
        }
    }
}

impl SourceEndpoints {
    /// All endpoints with their field names, for validation
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("instant_answer", &self.instant_answer),
            ("web_html", &self.web_html),
            ("encyclopedia", &self.encyclopedia),
            ("tech_news", &self.tech_news),
            ("programming_qa", &self.programming_qa),
            ("social", &self.social),
            ("weather", &self.weather),
            ("exchange_rates", &self.exchange_rates),
            ("world_time", &self.world_time),
        ]
    }

    /// Point every endpoint at one base URL (used against mock servers)
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            instant_answer: base.to_string(),
            web_html: format!("{}/html", base),
            encyclopedia: base.to_string(),
            tech_news: format!("{}/api/v1", base),
            programming_qa: format!("{}/2.3", base),
            social: base.to_string(),
            weather: base.to_string(),
            exchange_rates: format!("{}/v6", base),
            world_time: format!("{}/api", base),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_image_model(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            non_streaming_markers: default_non_streaming_markers(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            direct_first: true,
            user_agent: None,
            proxies: default_proxies(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_results: default_max_results(),
            source_timeout_secs: default_source_timeout(),
            enrich_top: 0,
            endpoints: SourceEndpoints::default(),
        }
    }
}

impl ChatConfig {
    /// Create a chat configuration with defaults for everything optional
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<SecretString>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_history: default_max_history(),
            timeout_secs: default_chat_timeout(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_system_prompt() -> String { "You are a helpful and smart assistant.".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 4096 }
fn default_max_history() -> usize { 20 }
fn default_chat_timeout() -> u64 { 120 }
fn default_image_model() -> String { "gemini-2.5-flash-image".to_string() }
fn default_non_streaming_markers() -> Vec<String> { vec!["thinking".to_string()] }
fn default_attempt_timeout() -> u64 { 10 }
fn default_connect_timeout() -> u64 { 5 }
fn default_max_results() -> usize { 10 }
fn default_source_timeout() -> u64 { 8 }

fn default_proxies() -> Vec<ProxyEndpoint> {
    vec![
        ProxyEndpoint::new("allorigins", "https://api.allorigins.win/raw?url={url}"),
        ProxyEndpoint::new("corsproxy", "https://corsproxy.io/?url={url}"),
        ProxyEndpoint::new("codetabs", "https://api.codetabs.com/v1/proxy?quest={url}"),
    ]
}

impl ChatwireConfig {
    /// Create a configuration around a chat section, everything else defaulted
    pub fn new(chat: ChatConfig) -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            chat,
            image: ImageConfig::default(),
            streaming: StreamingConfig::default(),
            fetch: FetchConfig::default(),
            search: SearchConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::missing("version"));
        }

        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::UnsupportedVersion {
                    expected: CONFIG_VERSION,
                    found: self.version.clone(),
                },
            ));
        }

        self.chat.validate("chat")?;

        if self.image.model.is_empty() {
            return Err(ValidationError::missing("image.model"));
        }

        if self.streaming.non_streaming_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(ValidationError::malformed(
                "streaming.non_streaming_markers",
                "markers must not be blank",
            ));
        }

        self.fetch.validate("fetch")?;
        self.search.validate("search")?;

        Ok(())
    }
}

impl ChatConfig {
    /// Validate chat configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::missing(format!("{}.base_url", path)));
        }

        // API key may still be an env var placeholder at this point
        if self.api_key.is_empty() {
            return Err(ValidationError::missing(format!("{}.api_key", path)));
        }

        if self.model.is_empty() {
            return Err(ValidationError::missing(format!("{}.model", path)));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::out_of_range(
                format!("{}.temperature", path),
                "Temperature must be between 0.0 and 2.0",
            ));
        }

        if self.max_tokens == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_tokens", path),
                "max_tokens must be positive",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.timeout_secs", path),
                "Timeout must be positive",
            ));
        }

        Ok(())
    }
}

impl FetchConfig {
    /// Validate fetch configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.attempt_timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.attempt_timeout_secs", path),
                "Timeout must be positive",
            ));
        }

        if !self.direct_first && self.proxies.is_empty() {
            return Err(ValidationError::missing(format!("{}.proxies", path))
                .with_hint("Direct fetching is disabled, so at least one proxy is needed"));
        }

        let mut seen_names = std::collections::HashSet::new();
        for (i, proxy) in self.proxies.iter().enumerate() {
            if !seen_names.insert(&proxy.name) {
                return Err(ValidationError::new(
                    format!("{}.proxies[{}].name", path, i),
                    ValidationErrorKind::Duplicate(proxy.name.clone()),
                ));
            }

            if !proxy.has_placeholder() {
                return Err(ValidationError::malformed(
                    format!("{}.proxies[{}].template", path, i),
                    "template must contain {url} or {raw_url}",
                ));
            }
        }

        Ok(())
    }
}

impl SearchConfig {
    /// Validate search configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if !(1..=20).contains(&self.default_max_results) {
            return Err(ValidationError::out_of_range(
                format!("{}.default_max_results", path),
                "Result cap must be between 1 and 20",
            ));
        }

        if self.source_timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.source_timeout_secs", path),
                "Timeout must be positive",
            ));
        }

        if self.enrich_top > self.default_max_results {
            return Err(ValidationError::out_of_range(
                format!("{}.enrich_top", path),
                "Cannot enrich more results than are returned",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ChatwireConfig {
        ChatwireConfig::new(ChatConfig::new(
            "https://api.example.com/v1",
            "sk-test",
            "gemini-3-flash-preview",
        ))
    }

    #[test]
    fn test_defaults_validate() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut config = base_config();
        config.version = "2.0".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "version");
        assert!(matches!(err.kind, ValidationErrorKind::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = base_config();
        config.chat.temperature = 3.5;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "chat.temperature");
    }

    #[test]
    fn test_proxy_template_needs_placeholder() {
        let mut config = base_config();
        config.fetch.proxies = vec![ProxyEndpoint::new("broken", "https://proxy.example/")];
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "fetch.proxies[0].template");
    }

    #[test]
    fn test_duplicate_proxy_names() {
        let mut config = base_config();
        config.fetch.proxies = vec![
            ProxyEndpoint::new("same", "https://a.example/?u={url}"),
            ProxyEndpoint::new("same", "https://b.example/?u={url}"),
        ];
        let err = config.validate().unwrap_err();
        assert!(matches!(err.kind, ValidationErrorKind::Duplicate(_)));
    }

    #[test]
    fn test_result_cap_range() {
        let mut config = base_config();
        config.search.default_max_results = 0;
        assert!(config.validate().is_err());
        config.search.default_max_results = 21;
        assert!(config.validate().is_err());
        config.search.default_max_results = 20;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_endpoints_at_one_base() {
        let endpoints = SourceEndpoints::all_at("http://127.0.0.1:9999/");
        assert_eq!(endpoints.weather, "http://127.0.0.1:9999");
        assert_eq!(endpoints.tech_news, "http://127.0.0.1:9999/api/v1");
    }
}

//! Chat completion client

use super::{build_messages, ChatError};
use crate::config::{ChatConfig, ChatwireConfig, ImageConfig, SecretString};
use crate::http::{HttpClient, RequestOptions};
use crate::protocol::{ChatMessage, ChatRequest, ContentPart, ImagePayload, StreamOptions};
use crate::stream::{decode_fragments, extract_image, single_fragment, FragmentStream, StreamingPolicy};
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Characters of the raw response kept when no image was found
const RAW_DUMP_CHARS: usize = 1500;

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct ChatClient {
    chat: ChatConfig,
    image: ImageConfig,
    http: HttpClient,
    policy: StreamingPolicy,
}

impl ChatClient {
    /// Create a client with default image settings and streaming policy
    pub fn new(chat: ChatConfig, http: HttpClient) -> Self {
        Self {
            chat,
            image: ImageConfig::default(),
            http,
            policy: StreamingPolicy::default(),
        }
    }

    /// Create a client from a full configuration
    pub fn from_config(config: &ChatwireConfig) -> Result<Self, ChatError> {
        let http = HttpClient::from_config(&config.fetch)?;
        debug!(
            "Chat client for {} using token {}",
            config.chat.base_url,
            config.chat.api_key.fingerprint()
        );
        Ok(Self::new(config.chat.clone(), http)
            .with_image_config(config.image.clone())
            .with_policy(StreamingPolicy::from_config(&config.streaming)))
    }

    pub fn with_image_config(mut self, image: ImageConfig) -> Self {
        self.image = image;
        self
    }

    pub fn with_policy(mut self, policy: StreamingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &StreamingPolicy {
        &self.policy
    }

    /// Request a completion for `history` and return its text fragments.
    ///
    /// The transport mode comes from the streaming policy; callers see the
    /// same fragment stream either way.
    pub async fn complete(
        &self,
        history: &[ChatMessage],
        options: &StreamOptions,
    ) -> Result<FragmentStream, ChatError> {
        let stream = self
            .policy
            .should_stream(&options.model, options.force_non_streaming);

        let request = ChatRequest {
            model: options.model.clone(),
            messages: build_messages(
                options.system_prompt.as_deref(),
                history,
                self.chat.max_history,
            ),
            temperature: options.temperature,
            stream,
            max_tokens: Some(self.chat.max_tokens),
        };

        let url = completions_url(&self.chat.base_url);
        let request_options = RequestOptions::new(Duration::from_secs(self.chat.timeout_secs));
        info!(
            "Chat completion: model={} messages={} stream={} [request_id: {}]",
            request.model,
            request.messages.len(),
            stream,
            request_options.request_id
        );

        let response = self
            .http
            .post_json(&url, &request, bearer(&options.api_token), &request_options)
            .await?;

        if stream {
            Ok(decode_fragments(response.bytes_stream()))
        } else {
            let body = self.http.read_text(response, &url).await?;
            single_fragment(&body)
        }
    }

    /// Request a completion and concatenate every fragment
    pub async fn complete_text(
        &self,
        history: &[ChatMessage],
        options: &StreamOptions,
    ) -> Result<String, ChatError> {
        let mut fragments = self.complete(history, options).await?;
        let mut text = String::new();

        while let Some(fragment) = fragments.next().await {
            text.push_str(&fragment?);
        }

        Ok(text)
    }

    /// Generate an image from `prompt`, or edit `reference_b64` when given.
    ///
    /// Uses the image base URL when configured, the chat one otherwise.
    pub async fn generate_image(
        &self,
        prompt: &str,
        reference_b64: Option<&str>,
    ) -> Result<ImagePayload, ChatError> {
        let message = match reference_b64 {
            Some(image) => ChatMessage::user_parts(vec![
                ContentPart::inline_image("image/jpeg", image),
                ContentPart::text(format!("Edit this image: {}", prompt)),
            ]),
            None => ChatMessage::user(format!("Generate an image: {}", prompt)),
        };

        let request = ChatRequest {
            model: self.image.model.clone(),
            messages: vec![message],
            temperature: None,
            stream: false,
            max_tokens: Some(self.chat.max_tokens),
        };

        let base_url = self.image.base_url.as_deref().unwrap_or(&self.chat.base_url);
        let url = completions_url(base_url);
        let request_options = RequestOptions::new(Duration::from_secs(self.chat.timeout_secs));
        info!(
            "Image request: model={} edit={} [request_id: {}]",
            request.model,
            reference_b64.is_some(),
            request_options.request_id
        );

        let response = self
            .http
            .post_json(&url, &request, bearer(&self.chat.api_key), &request_options)
            .await?;
        let body = self.http.read_text(response, &url).await?;

        let raw: Value = serde_json::from_str(&body)
            .map_err(|e| ChatError::InvalidResponse(format!("Response is not JSON: {}", e)))?;

        match extract_image(&raw) {
            Some(image) => {
                debug!("Image response decoded");
                Ok(image)
            }
            None => {
                warn!("Image response from {} carried no image", request.model);
                let dump = serde_json::to_string_pretty(&raw).unwrap_or(body);
                Err(ChatError::NoImage {
                    raw: dump.chars().take(RAW_DUMP_CHARS).collect(),
                })
            }
        }
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn bearer(token: &SecretString) -> Option<&SecretString> {
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("https://api.example.com/v1/"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:8080"),
            "http://localhost:8080/chat/completions"
        );
    }

    #[test]
    fn test_empty_token_sends_no_auth() {
        assert!(bearer(&SecretString::default()).is_none());
        assert!(bearer(&SecretString::from("sk-1")).is_some());
    }
}

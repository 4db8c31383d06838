//! Core protocol types for chat completion requests
//!
//! These mirror the OpenAI-compatible wire format spoken by the chat
//! gateway. Responses are not modelled as structs: providers disagree on
//! their shape, so they are read as `serde_json::Value` by the extractors in
//! [`crate::stream`].

use crate::config::{ChatConfig, SecretString};
use serde::{Deserialize, Serialize};

/// Models offered by the default gateway
pub const KNOWN_MODELS: &[&str] = &[
    "claude-haiku-4.5",
    "claude-opus-4.5",
    "claude-opus-4.5-thinking",
    "claude-sonnet-4",
    "claude-sonnet-4.5",
    "claude-sonnet-4.5-thinking",
    "gemini-2.5-computer-use-preview",
    "gemini-2.5-flash",
    "gemini-2.5-flash-image",
    "gemini-2.5-flash-lite",
    "gemini-2.5-pro",
    "gemini-3-flash-preview",
    "gemini-3-pro-image-preview",
    "gemini-3-pro-preview",
];

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

/// Content of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Structured content parts (for multimodal support)
    Parts(Vec<ContentPart>),
}

/// Individual content part for multimodal messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content part
    Text { text: String },
    /// Image by URL; inline images use `data:<mime>;base64,` URLs
    ImageUrl { image_url: ImageUrl },
}

/// URL wrapper used by `image_url` content parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ContentPart {
    /// Text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline base64 image part
    pub fn inline_image(mime: &str, base64: &str) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", mime, base64),
            },
        }
    }
}

impl MessageContent {
    /// First text found in the content, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            }),
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message made of multimodal parts
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Chat completion request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier to use
    pub model: String,

    /// Conversation messages, system prompt first
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Whether the body is delivered as server-sent events
    pub stream: bool,

    /// Maximum output tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Per-request options supplied by the caller. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    /// Model identifier
    pub model: String,

    /// Bearer token for the chat endpoint
    pub api_token: SecretString,

    /// System prompt; `None` sends no system message
    pub system_prompt: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Always use non-streaming transport
    pub force_non_streaming: bool,
}

impl StreamOptions {
    /// Options carrying the configured model, token, prompt and temperature
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            model: config.model.clone(),
            api_token: config.api_key.clone(),
            system_prompt: Some(config.system_prompt.clone()).filter(|p| !p.is_empty()),
            temperature: Some(config.temperature),
            force_non_streaming: false,
        }
    }

    /// Override the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the system prompt
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    /// Override the temperature
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Force (or stop forcing) non-streaming transport
    pub fn force_non_streaming(mut self, force: bool) -> Self {
        self.force_non_streaming = force;
        self
    }
}

/// Image returned by an image generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImagePayload {
    /// Base64-encoded image bytes
    Base64(String),
    /// Remote image URL
    Url(String),
}

//! Protocol module for chat request structures

pub mod types;

pub use types::{
    ChatMessage, ChatRequest, ContentPart, ImagePayload, ImageUrl, MessageContent, MessageRole,
    StreamOptions, KNOWN_MODELS,
};

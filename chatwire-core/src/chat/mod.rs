//! Chat completion requests
//!
//! Assembles the conversation, sends it with the transport chosen by the
//! streaming policy and hands back a [`FragmentStream`](crate::stream::FragmentStream).

mod client;
mod error;

pub use client::ChatClient;
pub use error::ChatError;

use crate::protocol::ChatMessage;

/// Assemble the outgoing message list.
///
/// The system prompt (when given and non-empty) comes first, followed by the
/// last `2 * max_history` history messages. `max_history == 0` keeps the
/// whole history.
pub fn build_messages(
    system_prompt: Option<&str>,
    history: &[ChatMessage],
    max_history: usize,
) -> Vec<ChatMessage> {
    let keep = match max_history {
        0 => history.len(),
        n => history.len().min(n.saturating_mul(2)),
    };
    let recent = &history[history.len() - keep..];

    system_prompt
        .filter(|prompt| !prompt.trim().is_empty())
        .map(ChatMessage::system)
        .into_iter()
        .chain(recent.iter().cloned())
        .collect()
}

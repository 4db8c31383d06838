//! Fragment decoding over a chunked response body
//!
//! Combines [`ChunkFramer`] and [`extract_delta`] into a pull-based stream
//! of non-empty text fragments.

use crate::chat::ChatError;
use crate::stream::extractor::extract_delta;
use crate::stream::framer::{ChunkFramer, Frame, FramedLine};
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use tracing::{debug, trace};

/// Lazy, one-shot sequence of text fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

struct DecodeState<S> {
    chunks: Pin<Box<S>>,
    framer: ChunkFramer,
    ready: VecDeque<String>,
    finished: bool,
}

impl<S> DecodeState<S> {
    /// Queue the fragments carried by `lines`, stopping at the end marker
    fn absorb(&mut self, lines: Vec<FramedLine>) {
        for line in lines {
            match line {
                FramedLine::Complete {
                    frame: Frame::Event(event),
                    ..
                } => {
                    if let Some(fragment) = extract_delta(&event) {
                        self.ready.push_back(fragment);
                    }
                }
                FramedLine::Complete {
                    frame: Frame::Done, ..
                } => {
                    trace!("End marker received");
                    self.finished = true;
                    return;
                }
                FramedLine::Complete {
                    frame: Frame::Ignored,
                    ..
                } => {}
                FramedLine::Incomplete { text } => {
                    debug!("Dropping incomplete stream remnant ({} bytes)", text.len());
                }
            }
        }
    }
}

/// Decode a chunked streaming body into text fragments.
///
/// The stream ends at the `[DONE]` marker or when `chunks` is exhausted,
/// whichever comes first. A transport error is yielded once as
/// [`ChatError::Stream`] and ends the stream.
pub fn decode_fragments<S, E>(chunks: S) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        chunks: Box::pin(chunks),
        framer: ChunkFramer::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.ready.pop_front() {
                return Some((Ok(fragment), state));
            }

            if state.finished {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.framer.push(&chunk);
                    state.absorb(lines);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(ChatError::Stream(e.to_string())), state));
                }
                None => {
                    let lines = state.framer.finish();
                    state.absorb(lines);
                    state.finished = true;
                }
            }
        }
    }))
}

/// Wrap a complete non-streaming response body as a fragment stream.
///
/// The whole answer becomes a single fragment; an answer without text
/// yields an empty stream.
pub fn single_fragment(body: &str) -> Result<FragmentStream, ChatError> {
    let response: Value = serde_json::from_str(body)
        .map_err(|e| ChatError::InvalidResponse(format!("Response is not JSON: {}", e)))?;

    let fragment = extract_delta(&response);
    if fragment.is_none() {
        debug!("Non-streaming response carried no text");
    }

    Ok(Box::pin(stream::iter(fragment.map(Ok::<String, ChatError>))))
}

//! Streaming transport selection

use crate::config::StreamingConfig;
use tracing::debug;

/// Decides per request whether the streaming transport is used.
///
/// Some model families drop the beginning of their answer when streamed.
/// They are recognised by case-insensitive substring markers and always get
/// the non-streaming transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingPolicy {
    /// Lowercased model id markers
    markers: Vec<String>,
}

impl Default for StreamingPolicy {
    fn default() -> Self {
        Self::from_config(&StreamingConfig::default())
    }
}

impl StreamingPolicy {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &StreamingConfig) -> Self {
        Self::new(&config.non_streaming_markers)
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Whether `model` belongs to a family whose streamed output is truncated
    pub fn is_truncation_prone(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        self.markers.iter().any(|marker| model.contains(marker.as_str()))
    }

    /// Whether a request for `model` should use the streaming transport
    pub fn should_stream(&self, model: &str, force_non_streaming: bool) -> bool {
        if force_non_streaming {
            return false;
        }

        if self.is_truncation_prone(model) {
            debug!("Model {} matches a non-streaming marker", model);
            return false;
        }

        true
    }
}

//! Multi-source information lookup
//!
//! A query is classified by [`IntentClassifier`]. Time, weather, currency and
//! news queries are first sent to a [`DirectAnswers`] provider; everything
//! else, and every direct answer that comes back empty, goes through the
//! [`SearchAggregator`] fan-out.

pub mod aggregator;
pub mod direct;
pub mod html;
pub mod intent;
pub mod service;
pub mod sources;

pub use aggregator::{clamp_max_results, merge_results, SearchAggregator};
pub use direct::DirectAnswers;
pub use intent::{CurrencyQuery, Intent, IntentClassifier};
pub use service::InfoService;

use crate::http::HttpError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One normalized answer from any source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,

    /// Link to the answer; may be empty for inline answers
    pub url: String,

    pub snippet: String,

    /// Label of the source that produced this result
    pub source: String,

    /// Extracted page text, when the result was enriched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            source: source.into(),
            content: None,
        }
    }
}

/// Outcome of a lookup. An empty lookup is `success: false`, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub intent: Intent,
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    /// A response without results
    pub fn empty(intent: Intent) -> Self {
        Self {
            success: false,
            intent,
            results: Vec::new(),
        }
    }

    /// A response over `results`; successful iff there is at least one
    pub fn from_results(intent: Intent, results: Vec<SearchResult>) -> Self {
        Self {
            success: !results.is_empty(),
            intent,
            results,
        }
    }
}

/// Errors from a single source or direct provider
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The source answered with something it should not have
    #[error("Unexpected response from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// The query lacks what the provider needs
    #[error("Cannot answer query: {0}")]
    Unanswerable(String),
}

impl SearchError {
    pub(crate) fn parse(source_name: &str, message: impl Into<String>) -> Self {
        SearchError::Parse {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

/// An independent search backend queried by the aggregator
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Label stored in [`SearchResult::source`]
    fn name(&self) -> &str;

    /// Whether this source is consulted for `query`
    fn applies_to(&self, _query: &str) -> bool {
        true
    }

    /// Return up to `limit` results for `query`
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError>;
}

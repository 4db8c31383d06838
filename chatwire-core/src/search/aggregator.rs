//! Concurrent fan-out over independent search sources

use super::sources::default_sources;
use super::{Intent, SearchResponse, SearchResult, SearchSource};
use crate::config::SearchConfig;
use crate::http::{HttpClient, ProxyChain};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Smallest and largest accepted result caps
pub const MIN_RESULTS: usize = 1;
pub const MAX_RESULTS: usize = 20;

/// Default result cap
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Clamp a requested result cap into the accepted range
pub fn clamp_max_results(requested: usize) -> usize {
    requested.clamp(MIN_RESULTS, MAX_RESULTS)
}

/// Merge per-source batches, given in priority order, into one list.
///
/// A result is dropped when its URL matches an earlier kept URL or its
/// snippet matches an earlier kept snippet. Empty URLs and snippets never
/// count as duplicates. The output holds at most `cap` results.
pub fn merge_results(batches: Vec<Vec<SearchResult>>, cap: usize) -> Vec<SearchResult> {
    let mut seen_urls = HashSet::new();
    let mut seen_snippets = HashSet::new();
    let mut merged = Vec::new();

    for result in batches.into_iter().flatten() {
        if merged.len() >= cap {
            break;
        }

        let url = result.url.clone();
        let snippet = result.snippet.clone();

        if (!url.is_empty() && seen_urls.contains(&url))
            || (!snippet.is_empty() && seen_snippets.contains(&snippet))
        {
            debug!("Dropping duplicate result '{}' from {}", result.title, result.source);
            continue;
        }

        if !url.is_empty() {
            seen_urls.insert(url);
        }
        if !snippet.is_empty() {
            seen_snippets.insert(snippet);
        }
        merged.push(result);
    }

    merged
}

/// Queries every applicable source concurrently and merges the answers.
///
/// Each source runs as its own task under its own timeout; an error, a
/// timeout or a panic in one source only costs that source's results.
#[derive(Clone)]
pub struct SearchAggregator {
    sources: Vec<Arc<dyn SearchSource>>,
    source_timeout: Duration,
    default_max_results: usize,
}

impl SearchAggregator {
    /// Create an aggregator over `sources`, given in merge priority order
    pub fn new(sources: Vec<Arc<dyn SearchSource>>, source_timeout: Duration) -> Self {
        Self {
            sources,
            source_timeout,
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Create an aggregator over the default sources
    pub fn from_config(config: &SearchConfig, http: &HttpClient, chain: &ProxyChain) -> Self {
        Self::new(
            default_sources(
                http,
                chain,
                &config.endpoints,
                Duration::from_secs(config.source_timeout_secs),
            ),
            Duration::from_secs(config.source_timeout_secs),
        )
        .with_default_max_results(config.default_max_results)
    }

    pub fn with_default_max_results(mut self, max_results: usize) -> Self {
        self.default_max_results = clamp_max_results(max_results);
        self
    }

    /// Names of the configured sources, in priority order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Search every applicable source. Never fails.
    pub async fn search(&self, query: &str, max_results: Option<usize>) -> SearchResponse {
        let cap = clamp_max_results(max_results.unwrap_or(self.default_max_results));
        let query = query.trim();
        if query.is_empty() {
            return SearchResponse::empty(Intent::Search);
        }

        let active: Vec<Arc<dyn SearchSource>> = self
            .sources
            .iter()
            .filter(|source| source.applies_to(query))
            .cloned()
            .collect();
        debug!(
            "Searching '{}' across {} of {} sources",
            query,
            active.len(),
            self.sources.len()
        );

        let handles: Vec<_> = active
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let query = query.to_string();
                let timeout = self.source_timeout;
                tokio::spawn(async move {
                    tokio::time::timeout(timeout, source.search(&query, cap)).await
                })
            })
            .collect();

        let mut batches = Vec::with_capacity(handles.len());
        for (source, outcome) in active.iter().zip(join_all(handles).await) {
            let batch = match outcome {
                Ok(Ok(Ok(results))) => results,
                Ok(Ok(Err(e))) => {
                    warn!("Source {} failed: {}", source.name(), e);
                    Vec::new()
                }
                Ok(Err(_)) => {
                    warn!(
                        "Source {} timed out after {:?}",
                        source.name(),
                        self.source_timeout
                    );
                    Vec::new()
                }
                Err(e) => {
                    warn!("Source {} task aborted: {}", source.name(), e);
                    Vec::new()
                }
            };
            debug!("Source {} returned {} results", source.name(), batch.len());
            batches.push(batch);
        }

        let results = merge_results(batches, cap);
        info!("Search for '{}' produced {} results", query, results.len());
        SearchResponse::from_results(Intent::Search, results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, snippet: &str) -> SearchResult {
        SearchResult::new("t", url, snippet, "test")
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_max_results(0), 1);
        assert_eq!(clamp_max_results(7), 7);
        assert_eq!(clamp_max_results(500), 20);
    }

    #[test]
    fn test_merge_dedups_by_url_and_snippet() {
        let merged = merge_results(
            vec![
                vec![result("https://a", "alpha"), result("https://b", "beta")],
                vec![
                    result("https://a", "other"),
                    result("https://c", "beta"),
                    result("https://d", "delta"),
                ],
            ],
            10,
        );

        let urls: Vec<&str> = merged.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://d"]);
    }

    #[test]
    fn test_dedup_uses_exact_equality() {
        let merged = merge_results(
            vec![
                vec![result("https://a", "alpha")],
                vec![result("https://a/", "alpha ")],
                vec![result("https://A", "Alpha")],
            ],
            10,
        );
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_empty_fields_are_not_identities() {
        let merged = merge_results(
            vec![vec![result("", "x"), result("", "y"), result("https://z", ""), result("https://w", "")]],
            10,
        );
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_merge_caps_output() {
        let batch: Vec<SearchResult> = (0..30)
            .map(|i| result(&format!("https://r/{}", i), &format!("s{}", i)))
            .collect();
        assert_eq!(merge_results(vec![batch], 5).len(), 5);
    }
}

//! Information lookup entry point

use super::aggregator::{clamp_max_results, SearchAggregator};
use super::direct::DirectAnswers;
use super::html::extract_page_text;
use super::intent::{Intent, IntentClassifier};
use super::{SearchResponse, SearchResult};
use crate::config::ChatwireConfig;
use crate::http::{FetchOutcome, HttpClient, HttpError, ProxyChain};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Characters of page text attached to an enriched result
pub const ENRICHED_CONTENT_CHARS: usize = 2000;

/// Classifies a query, tries a direct answer and falls back to search
#[derive(Clone)]
pub struct InfoService {
    classifier: IntentClassifier,
    direct: DirectAnswers,
    aggregator: SearchAggregator,
    chain: ProxyChain,
    default_max_results: usize,
    enrich_top: usize,
}

impl InfoService {
    pub fn new(direct: DirectAnswers, aggregator: SearchAggregator, chain: ProxyChain) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            direct,
            aggregator,
            chain,
            default_max_results: super::aggregator::DEFAULT_MAX_RESULTS,
            enrich_top: 0,
        }
    }

    /// Build the service and every collaborator from configuration
    pub fn from_config(config: &ChatwireConfig) -> Result<Self, HttpError> {
        let http = HttpClient::from_config(&config.fetch)?;
        let chain = ProxyChain::from_config(http.clone(), &config.fetch);
        let direct = DirectAnswers::new(
            http.clone(),
            config.search.endpoints.clone(),
            Duration::from_secs(config.search.source_timeout_secs),
        );
        let aggregator = SearchAggregator::from_config(&config.search, &http, &chain);

        Ok(Self::new(direct, aggregator, chain)
            .with_default_max_results(config.search.default_max_results)
            .with_enrich_top(config.search.enrich_top))
    }

    pub fn with_default_max_results(mut self, max_results: usize) -> Self {
        self.default_max_results = clamp_max_results(max_results);
        self
    }

    /// Re-fetch the pages of the top `count` results and attach their text
    pub fn with_enrich_top(mut self, count: usize) -> Self {
        self.enrich_top = count;
        self
    }

    pub fn classify(&self, query: &str) -> Intent {
        self.classifier.classify(query)
    }

    /// Look up `query`. Never fails; an empty lookup has `success: false`.
    pub async fn lookup(&self, query: &str, max_results: Option<usize>) -> SearchResponse {
        let cap = clamp_max_results(max_results.unwrap_or(self.default_max_results));
        let intent = self.classifier.classify(query);
        debug!("Query '{}' classified as {}", query, intent);

        if intent != Intent::Search {
            match self.direct.answer(intent, query, cap).await {
                Ok(mut results) if !results.is_empty() => {
                    results.truncate(cap);
                    info!("Direct {} answer with {} results", intent, results.len());
                    return SearchResponse::from_results(intent, results);
                }
                Ok(_) => info!("Direct {} provider had no answer, searching instead", intent),
                Err(e) => warn!("Direct {} provider failed: {}; searching instead", intent, e),
            }
        }

        let mut response = self.aggregator.search(query, Some(cap)).await;
        response.intent = intent;
        self.enrich(&mut response.results).await;
        response
    }

    /// Attach page text to the first `enrich_top` results with a link
    async fn enrich(&self, results: &mut [SearchResult]) {
        if self.enrich_top == 0 {
            return;
        }

        let targets: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.url.starts_with("http"))
            .map(|(i, _)| i)
            .take(self.enrich_top)
            .collect();

        let outcomes = join_all(
            targets
                .iter()
                .map(|&i| self.chain.fetch_outcome(&results[i].url)),
        )
        .await;

        for (i, outcome) in targets.into_iter().zip(outcomes) {
            match outcome {
                FetchOutcome::Success { body, via } => {
                    debug!("Enriched {} via {}", results[i].url, via);
                    let text = extract_page_text(&body, ENRICHED_CONTENT_CHARS);
                    results[i].content = Some(text).filter(|t| !t.is_empty());
                }
                FetchOutcome::Failure { reason } => {
                    debug!("Could not enrich {}: {}", results[i].url, reason);
                }
            }
        }
    }
}

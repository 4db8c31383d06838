//! Ordered proxy fallback for page fetching
//!
//! A target URL is tried directly (optionally) and then through each proxy
//! endpoint in order. Every attempt gets exactly one try with its own
//! timeout; the first 2xx response wins.

use crate::config::FetchConfig;
use crate::http::{HttpClient, HttpError, RequestOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const URL_PLACEHOLDER: &str = "{url}";
const RAW_URL_PLACEHOLDER: &str = "{raw_url}";

/// A named proxy service described by a URL template.
///
/// `{url}` is replaced by the percent-encoded target, `{raw_url}` by the
/// target as-is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyEndpoint {
    /// Name used in logs and failure reports
    pub name: String,

    /// URL template
    pub template: String,
}

impl ProxyEndpoint {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Whether the template references the target at all
    pub fn has_placeholder(&self) -> bool {
        self.template.contains(URL_PLACEHOLDER) || self.template.contains(RAW_URL_PLACEHOLDER)
    }

    /// Build the proxied URL for `target`
    pub fn proxied_url(&self, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        self.template
            .replace(URL_PLACEHOLDER, &encoded)
            .replace(RAW_URL_PLACEHOLDER, target)
    }
}

/// Result of a fetch that must not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A body was retrieved; `via` names the attempt that produced it
    Success { body: String, via: String },
    /// Every attempt failed
    Failure { reason: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// The body, if the fetch succeeded
    pub fn body(&self) -> Option<&str> {
        match self {
            FetchOutcome::Success { body, .. } => Some(body),
            FetchOutcome::Failure { .. } => None,
        }
    }
}

/// Direct fetch followed by ordered proxy fallbacks
#[derive(Clone)]
pub struct ProxyChain {
    client: HttpClient,
    endpoints: Vec<ProxyEndpoint>,
    direct_first: bool,
    attempt_timeout: Duration,
}

impl ProxyChain {
    /// Create a chain that tries the target directly before the proxies
    pub fn new(client: HttpClient, endpoints: Vec<ProxyEndpoint>, attempt_timeout: Duration) -> Self {
        Self {
            client,
            endpoints,
            direct_first: true,
            attempt_timeout,
        }
    }

    /// Create a chain from fetch configuration
    pub fn from_config(client: HttpClient, config: &FetchConfig) -> Self {
        Self::new(
            client,
            config.proxies.clone(),
            Duration::from_secs(config.attempt_timeout_secs),
        )
        .with_direct_first(config.direct_first)
    }

    /// Set whether the target is tried directly before any proxy
    pub fn with_direct_first(mut self, direct_first: bool) -> Self {
        self.direct_first = direct_first;
        self
    }

    /// Configured proxy endpoints, in order
    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.endpoints
    }

    /// The (label, url) pairs that will be attempted for `target`, in order
    pub fn attempt_urls(&self, target: &str) -> Vec<(String, String)> {
        let direct = self
            .direct_first
            .then(|| ("direct".to_string(), target.to_string()));

        direct
            .into_iter()
            .chain(
                self.endpoints
                    .iter()
                    .map(|endpoint| (endpoint.name.clone(), endpoint.proxied_url(target))),
            )
            .collect()
    }

    /// Fetch `target`, returning the first successful body.
    ///
    /// Fails with [`HttpError::Exhausted`] once every attempt has failed.
    pub async fn fetch(&self, target: &str) -> Result<String, HttpError> {
        self.run(target)
            .await
            .map(|(body, _)| body)
            .map_err(|failures| HttpError::Exhausted {
                url: target.to_string(),
                failures,
            })
    }

    /// Fetch `target` without failing; exhaustion becomes a `Failure` outcome
    pub async fn fetch_outcome(&self, target: &str) -> FetchOutcome {
        match self.run(target).await {
            Ok((body, via)) => FetchOutcome::Success { body, via },
            Err(failures) if failures.is_empty() => FetchOutcome::Failure {
                reason: format!("No fetch attempts configured for {}", target),
            },
            Err(failures) => FetchOutcome::Failure {
                reason: failures.join("; "),
            },
        }
    }

    /// Try each attempt in order; returns the body and the label that
    /// produced it, or every attempt's failure
    async fn run(&self, target: &str) -> Result<(String, String), Vec<String>> {
        let mut failures = Vec::new();

        for (label, url) in self.attempt_urls(target) {
            let options = RequestOptions::new(self.attempt_timeout);
            match self.client.get_text(&url, &options).await {
                Ok(body) => {
                    if failures.is_empty() {
                        debug!("Fetched {} via {}", target, label);
                    } else {
                        info!(
                            "Fetched {} via {} after {} failed attempts",
                            target,
                            label,
                            failures.len()
                        );
                    }
                    return Ok((body, label));
                }
                Err(e) => {
                    warn!("Fetch attempt '{}' for {} failed: {}", label, target, e);
                    failures.push(format!("{}: {}", label, e));
                }
            }
        }

        Err(failures)
    }
}

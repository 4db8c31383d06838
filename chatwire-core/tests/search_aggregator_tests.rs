//! Fan-out, isolation and merge behavior of the search aggregator

use async_trait::async_trait;
use chatwire_core::search::{Intent, SearchAggregator, SearchError, SearchResult, SearchSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

enum Behavior {
    Answer(Vec<(String, String)>),
    Slow(Duration),
    Fail,
    Panic,
}

struct FakeSource {
    name: &'static str,
    behavior: Behavior,
    only_for: Option<&'static str>,
    calls: AtomicUsize,
    last_limit: AtomicUsize,
}

impl FakeSource {
    fn new(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            only_for: None,
            calls: AtomicUsize::new(0),
            last_limit: AtomicUsize::new(0),
        }
    }

    fn answering(name: &'static str, results: Vec<(&str, &str)>) -> Self {
        let results = results
            .into_iter()
            .map(|(url, snippet)| (url.to_string(), snippet.to_string()))
            .collect();
        Self::new(name, Behavior::Answer(results))
    }

    fn gated_on(mut self, keyword: &'static str) -> Self {
        self.only_for = Some(keyword);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchSource for FakeSource {
    fn name(&self) -> &str {
        self.name
    }

    fn applies_to(&self, query: &str) -> bool {
        self.only_for.map_or(true, |keyword| query.contains(keyword))
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);

        match &self.behavior {
            Behavior::Answer(results) => Ok(results
                .iter()
                .map(|(url, snippet)| SearchResult::new("title", url.as_str(), snippet.as_str(), self.name))
                .collect()),
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(vec![SearchResult::new("late", "https://late", "late", self.name)])
            }
            Behavior::Fail => Err(SearchError::Unanswerable("backend down".to_string())),
            Behavior::Panic => panic!("source blew up"),
        }
    }
}

fn aggregator(sources: &[Arc<FakeSource>], timeout: Duration) -> SearchAggregator {
    let sources: Vec<Arc<dyn SearchSource>> = sources
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn SearchSource>)
        .collect();
    SearchAggregator::new(sources, timeout)
}

fn urls(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.url.as_str()).collect()
}

#[tokio::test]
async fn test_slow_sources_time_out_without_blocking_the_rest() {
    let first = Arc::new(FakeSource::answering(
        "first",
        vec![
            ("https://a.example", "alpha"),
            ("https://b.example", "beta"),
            ("https://c.example", "gamma"),
        ],
    ));
    let slow_one = Arc::new(FakeSource::new("slow_one", Behavior::Slow(Duration::from_secs(5))));
    let second = Arc::new(FakeSource::answering(
        "second",
        vec![("https://c.example", "gamma again"), ("https://d.example", "delta")],
    ));
    let slow_two = Arc::new(FakeSource::new("slow_two", Behavior::Slow(Duration::from_secs(5))));

    let aggregator = aggregator(
        &[first, slow_one, second, slow_two],
        Duration::from_millis(100),
    );

    let started = Instant::now();
    let response = aggregator.search("rust ownership", Some(10)).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(response.success);
    assert_eq!(response.intent, Intent::Search);
    assert_eq!(
        urls(&response.results),
        vec![
            "https://a.example",
            "https://b.example",
            "https://c.example",
            "https://d.example"
        ]
    );
}

#[tokio::test]
async fn test_every_source_failing_is_an_unsuccessful_response() {
    let sources = [
        Arc::new(FakeSource::new("down", Behavior::Fail)),
        Arc::new(FakeSource::new("slow", Behavior::Slow(Duration::from_secs(5)))),
        Arc::new(FakeSource::answering("empty", vec![])),
    ];

    let response = aggregator(&sources, Duration::from_millis(100))
        .search("anything at all", None)
        .await;

    assert!(!response.success);
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_panicking_source_is_isolated() {
    let sources = [
        Arc::new(FakeSource::new("broken", Behavior::Panic)),
        Arc::new(FakeSource::answering("healthy", vec![("https://ok.example", "fine")])),
    ];

    let response = aggregator(&sources, Duration::from_secs(1))
        .search("query", None)
        .await;

    assert!(response.success);
    assert_eq!(urls(&response.results), vec!["https://ok.example"]);
}

#[tokio::test]
async fn test_earlier_source_wins_duplicates() {
    let sources = [
        Arc::new(FakeSource::answering("primary", vec![("https://same.example", "from primary")])),
        Arc::new(FakeSource::answering(
            "secondary",
            vec![
                ("https://same.example", "from secondary"),
                ("https://other.example", "from primary"),
                ("https://new.example", "fresh"),
            ],
        )),
    ];

    let response = aggregator(&sources, Duration::from_secs(1)).search("q", None).await;

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].source, "primary");
    assert_eq!(response.results[1].url, "https://new.example");
}

#[tokio::test]
async fn test_result_cap_is_clamped() {
    let many = (0..30)
        .map(|i| (format!("https://r.example/{}", i), format!("snippet {}", i)))
        .collect();
    let source = Arc::new(FakeSource::new("bulk", Behavior::Answer(many)));
    let aggregator = aggregator(&[Arc::clone(&source)], Duration::from_secs(1));

    assert_eq!(aggregator.search("q", None).await.results.len(), 10);
    assert_eq!(source.last_limit.load(Ordering::SeqCst), 10);

    assert_eq!(aggregator.search("q", Some(50)).await.results.len(), 20);
    assert_eq!(source.last_limit.load(Ordering::SeqCst), 20);

    assert_eq!(aggregator.search("q", Some(0)).await.results.len(), 1);
}

#[tokio::test]
async fn test_gated_source_only_runs_for_matching_queries() {
    let general = Arc::new(FakeSource::answering("general", vec![("https://g.example", "g")]));
    let code = Arc::new(
        FakeSource::answering("code", vec![("https://code.example", "c")]).gated_on("python"),
    );
    let aggregator = aggregator(&[Arc::clone(&general), Arc::clone(&code)], Duration::from_secs(1));

    let plain = aggregator.search("best hiking trails", None).await;
    assert_eq!(urls(&plain.results), vec!["https://g.example"]);
    assert_eq!(code.calls(), 0);

    let coding = aggregator.search("python list comprehension", None).await;
    assert_eq!(
        urls(&coding.results),
        vec!["https://g.example", "https://code.example"]
    );
    assert_eq!(code.calls(), 1);
    assert_eq!(general.calls(), 2);
}

#[tokio::test]
async fn test_blank_query_contacts_nothing() {
    let source = Arc::new(FakeSource::answering("any", vec![("https://x.example", "x")]));
    let aggregator = aggregator(&[Arc::clone(&source)], Duration::from_secs(1));

    let response = aggregator.search("   ", None).await;

    assert!(!response.success);
    assert_eq!(source.calls(), 0);
    assert_eq!(aggregator.source_names(), vec!["any"]);
}

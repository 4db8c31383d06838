//! Proxy fallback chain tests

use chatwire_core::config::FetchConfig;
use chatwire_core::http::{FetchOutcome, HttpClient, HttpError, ProxyChain, ProxyEndpoint};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoints(server: &MockServer, names: &[&str]) -> Vec<ProxyEndpoint> {
    names
        .iter()
        .map(|name| ProxyEndpoint::new(*name, format!("{}/{}?url={{url}}", server.uri(), name)))
        .collect()
}

/// Show fallback transitions with `RUST_LOG=chatwire_core=debug`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn chain(endpoints: Vec<ProxyEndpoint>) -> ProxyChain {
    init_tracing();
    ProxyChain::new(HttpClient::new().unwrap(), endpoints, Duration::from_secs(2))
}

#[tokio::test]
async fn test_third_proxy_answers_after_two_failures() {
    let server = MockServer::start().await;
    let target = "https://example.com/article?id=7";

    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/third"))
        .and(query_param("url", target))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>third</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let chain = chain(endpoints(&server, &["first", "second", "third"])).with_direct_first(false);

    let body = chain.fetch(target).await.unwrap();
    assert_eq!(body, "<html>third</html>");
}

#[tokio::test]
async fn test_direct_success_skips_proxies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("direct body"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("proxied body"))
        .expect(0)
        .mount(&server)
        .await;

    let chain = chain(endpoints(&server, &["proxy"]));
    let target = format!("{}/page", server.uri());

    match chain.fetch_outcome(&target).await {
        FetchOutcome::Success { body, via } => {
            assert_eq!(body, "direct body");
            assert_eq!(via, "direct");
        }
        FetchOutcome::Failure { reason } => panic!("Unexpected failure: {}", reason),
    }
}

#[tokio::test]
async fn test_direct_failure_falls_back_to_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("proxied body"))
        .mount(&server)
        .await;

    let chain = chain(endpoints(&server, &["proxy"]));
    let outcome = chain.fetch_outcome(&format!("{}/page", server.uri())).await;

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            body: "proxied body".to_string(),
            via: "proxy".to_string()
        }
    );
}

#[tokio::test]
async fn test_exhausted_chain_reports_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let chain = chain(endpoints(&server, &["a", "b"]));
    let target = format!("{}/missing", server.uri());

    match chain.fetch(&target).await {
        Err(HttpError::Exhausted { url, failures }) => {
            assert_eq!(url, target);
            assert_eq!(failures.len(), 3);
            assert!(failures[0].starts_with("direct:"));
            assert!(failures[2].starts_with("b:"));
        }
        other => panic!("Expected exhaustion, got {:?}", other),
    }

    let outcome = chain.fetch_outcome(&target).await;
    assert!(!outcome.is_success());
    assert_eq!(outcome.body(), None);
}

#[tokio::test]
async fn test_slow_attempt_times_out_and_chain_moves_on() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("in time"))
        .mount(&server)
        .await;

    let chain = ProxyChain::new(
        HttpClient::new().unwrap(),
        endpoints(&server, &["slow", "fast"]),
        Duration::from_millis(300),
    )
    .with_direct_first(false);

    assert_eq!(chain.fetch("https://example.com").await.unwrap(), "in time");
}

#[test]
fn test_default_chain_order() {
    let config = FetchConfig::default();
    let chain = ProxyChain::from_config(HttpClient::new().unwrap(), &config);

    let names: Vec<&str> = chain.endpoints().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["allorigins", "corsproxy", "codetabs"]);

    let attempts = chain.attempt_urls("https://example.com/a b");
    assert_eq!(attempts[0].1, "https://example.com/a b");
    assert_eq!(
        attempts[1].1,
        "https://api.allorigins.win/raw?url=https%3A%2F%2Fexample.com%2Fa+b"
    );
    assert_eq!(
        attempts[3].1,
        "https://api.codetabs.com/v1/proxy?quest=https%3A%2F%2Fexample.com%2Fa+b"
    );
}

//! Search backends queried by the aggregator
//!
//! Each source normalizes its own response format into [`SearchResult`]s and
//! reports failures as [`SearchError`]; isolation is the aggregator's job.

use super::html::{clean_fragment, parse_search_result_blocks};
use super::{SearchError, SearchResult, SearchSource};
use crate::config::SourceEndpoints;
use crate::http::{HttpClient, ProxyChain, RequestOptions, DEFAULT_ATTEMPT_TIMEOUT};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Characters of a discussion post kept as its snippet
const POST_SNIPPET_CHARS: usize = 300;

static PROGRAMMING_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:code|coding|program(?:ming)?|python|rust|javascript|typescript|java|golang|kotlin|swift|sql|regex|compiler?|function|library|framework|api|bug|debug(?:ging)?|error|exception|stack\s*trace|git|npm|cargo|docker|linux|bash|algorithm)\b|c\+\+|c#",
    )
    .expect("Invalid keyword pattern")
});

static OPINION_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:best|worth|opinions?|recommend(?:ation)?s?|reviews?|vs|versus|should\s+i|experiences?|thoughts|anyone|reddit)\b",
    )
    .expect("Invalid keyword pattern")
});

/// Whether `query` looks like a programming question
pub fn is_programming_query(query: &str) -> bool {
    PROGRAMMING_KEYWORDS.is_match(query)
}

/// Whether `query` asks for opinions or discussion
pub fn is_opinion_query(query: &str) -> bool {
    OPINION_KEYWORDS.is_match(query)
}

/// Build `base` + `path` with encoded query parameters
pub(crate) fn endpoint_url(
    source: &str,
    base: &str,
    path: &str,
    params: &[(&str, &str)],
) -> Result<String, SearchError> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse_with_params(&raw, params)
        .map(|url| url.to_string())
        .map_err(|e| SearchError::parse(source, format!("Invalid endpoint {}: {}", raw, e)))
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default().trim()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Join the non-empty parts of a synthesized snippet.
///
/// Snippets double as dedup identities, so counters alone are never enough;
/// callers include author, date or item id alongside them.
fn snippet_of(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn id_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// The default source set in merge priority order
///
/// `timeout` bounds each HTTP request of the JSON sources; the web source
/// uses the proxy chain's own attempt timeout.
pub fn default_sources(
    http: &HttpClient,
    chain: &ProxyChain,
    endpoints: &SourceEndpoints,
    timeout: Duration,
) -> Vec<Arc<dyn SearchSource>> {
    vec![
        Arc::new(InstantAnswerSource::new(http.clone(), &endpoints.instant_answer).with_timeout(timeout)),
        Arc::new(WebSource::new(chain.clone(), &endpoints.web_html)),
        Arc::new(EncyclopediaSource::new(http.clone(), &endpoints.encyclopedia).with_timeout(timeout)),
        Arc::new(TechNewsSource::new(http.clone(), &endpoints.tech_news).with_timeout(timeout)),
        Arc::new(ProgrammingQaSource::new(http.clone(), &endpoints.programming_qa).with_timeout(timeout)),
        Arc::new(SocialSource::new(http.clone(), &endpoints.social).with_timeout(timeout)),
    ]
}

/// DuckDuckGo instant answer JSON API
pub struct InstantAnswerSource {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl InstantAnswerSource {
    pub const NAME: &'static str = "duckduckgo";

    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SearchSource for InstantAnswerSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let url = endpoint_url(
            Self::NAME,
            &self.base_url,
            "/",
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )?;

        let json: Value = self.http.get_json(&url, &RequestOptions::new(self.timeout)).await?;
        Ok(parse_instant_answer(&json, limit))
    }
}

/// Normalize an instant answer document
pub fn parse_instant_answer(json: &Value, limit: usize) -> Vec<SearchResult> {
    let name = InstantAnswerSource::NAME;
    let heading = str_field(json, "Heading");
    let abstract_url = str_field(json, "AbstractURL");
    let mut results = Vec::new();

    let answer = str_field(json, "Answer");
    if !answer.is_empty() {
        let title = if heading.is_empty() { "Instant answer" } else { heading };
        results.push(SearchResult::new(title, abstract_url, answer, name));
    }

    let abstract_text = str_field(json, "AbstractText");
    if !abstract_text.is_empty() {
        let title = if heading.is_empty() {
            str_field(json, "AbstractSource")
        } else {
            heading
        };
        results.push(SearchResult::new(title, abstract_url, abstract_text, name));
    }

    let definition = str_field(json, "Definition");
    if !definition.is_empty() {
        results.push(SearchResult::new(
            heading,
            str_field(json, "DefinitionURL"),
            definition,
            name,
        ));
    }

    // Topic groups nest their entries one level down
    let topics = json
        .get("RelatedTopics")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .flat_map(|topic| match topic.get("Topics").and_then(Value::as_array) {
            Some(group) => group.iter().collect::<Vec<_>>(),
            None => vec![topic],
        });

    for topic in topics {
        let text = str_field(topic, "Text");
        let url = str_field(topic, "FirstURL");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        let title = text.split(" - ").next().unwrap_or(text);
        results.push(SearchResult::new(truncate_chars(title, 100), url, text, name));
    }

    results.truncate(limit);
    results
}

/// DuckDuckGo HTML results page, fetched through the proxy chain
pub struct WebSource {
    chain: ProxyChain,
    base_url: String,
}

impl WebSource {
    pub const NAME: &'static str = "web";

    pub fn new(chain: ProxyChain, base_url: &str) -> Self {
        Self {
            chain,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl SearchSource for WebSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let target = endpoint_url(Self::NAME, &self.base_url, "/", &[("q", query)])?;
        let html = self.chain.fetch(&target).await?;

        let blocks = parse_search_result_blocks(&html);
        debug!("Web results page yielded {} blocks", blocks.len());

        Ok(blocks
            .into_iter()
            .take(limit)
            .map(|block| SearchResult::new(block.title, block.url, block.snippet, Self::NAME))
            .collect())
    }
}

/// Wikipedia full-text search
pub struct EncyclopediaSource {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl EncyclopediaSource {
    pub const NAME: &'static str = "wikipedia";

    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn article_url(&self, title: &str) -> String {
        let raw = format!("{}/wiki/{}", self.base_url, title.replace(' ', "_"));
        Url::parse(&raw).map(|u| u.to_string()).unwrap_or(raw)
    }
}

#[async_trait]
impl SearchSource for EncyclopediaSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let limit_param = limit.to_string();
        let url = endpoint_url(
            Self::NAME,
            &self.base_url,
            "/w/api.php",
            &[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit_param.as_str()),
                ("format", "json"),
                ("utf8", "1"),
            ],
        )?;

        let json: Value = self.http.get_json(&url, &RequestOptions::new(self.timeout)).await?;
        let hits = json
            .pointer("/query/search")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::parse(Self::NAME, "missing query.search"))?;

        Ok(hits
            .iter()
            .filter_map(|hit| {
                let title = str_field(hit, "title");
                (!title.is_empty()).then(|| {
                    SearchResult::new(
                        title,
                        self.article_url(title),
                        clean_fragment(str_field(hit, "snippet")),
                        Self::NAME,
                    )
                })
            })
            .take(limit)
            .collect())
    }
}

/// Hacker News search through the Algolia API
pub struct TechNewsSource {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl TechNewsSource {
    pub const NAME: &'static str = "hackernews";

    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SearchSource for TechNewsSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        fetch_hn_stories(&self.http, &self.base_url, Some(query), limit, self.timeout).await
    }
}

/// Stories matching `query`, or the front page when `query` is `None`
pub(crate) async fn fetch_hn_stories(
    http: &HttpClient,
    base_url: &str,
    query: Option<&str>,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<SearchResult>, SearchError> {
    let hits_per_page = limit.to_string();
    let mut params = vec![("hitsPerPage", hits_per_page.as_str())];
    match query {
        Some(q) => {
            params.push(("query", q));
            params.push(("tags", "story"));
        }
        None => params.push(("tags", "front_page")),
    }

    let url = endpoint_url(TechNewsSource::NAME, base_url, "/search", &params)?;
    let json: Value = http.get_json(&url, &RequestOptions::new(timeout)).await?;
    let hits = json
        .get("hits")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::parse(TechNewsSource::NAME, "missing hits"))?;

    Ok(hits.iter().filter_map(parse_hn_hit).take(limit).collect())
}

fn parse_hn_hit(hit: &Value) -> Option<SearchResult> {
    let title = Some(str_field(hit, "title"))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| str_field(hit, "story_title"));
    if title.is_empty() {
        return None;
    }

    let url = match str_field(hit, "url") {
        "" => format!(
            "https://news.ycombinator.com/item?id={}",
            str_field(hit, "objectID")
        ),
        url => url.to_string(),
    };

    let points = hit.get("points").and_then(Value::as_u64).unwrap_or(0);
    let comments = hit.get("num_comments").and_then(Value::as_u64).unwrap_or(0);
    let author = str_field(hit, "author");
    let snippet = snippet_of(&[
        format!("{} points", points),
        format!("{} comments", comments),
        if author.is_empty() { String::new() } else { format!("by {}", author) },
        str_field(hit, "created_at").to_string(),
        match id_field(hit, "objectID") {
            id if id.is_empty() => id,
            id => format!("item {}", id),
        },
    ]);

    Some(SearchResult::new(title, url, snippet, TechNewsSource::NAME))
}

/// Stack Exchange search, only for programming questions
pub struct ProgrammingQaSource {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl ProgrammingQaSource {
    pub const NAME: &'static str = "stackoverflow";

    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SearchSource for ProgrammingQaSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn applies_to(&self, query: &str) -> bool {
        is_programming_query(query)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let page_size = limit.to_string();
        let url = endpoint_url(
            Self::NAME,
            &self.base_url,
            "/search/advanced",
            &[
                ("order", "desc"),
                ("sort", "relevance"),
                ("q", query),
                ("site", "stackoverflow"),
                ("pagesize", page_size.as_str()),
            ],
        )?;

        let json: Value = self.http.get_json(&url, &RequestOptions::new(self.timeout)).await?;
        let items = json
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::parse(Self::NAME, "missing items"))?;

        Ok(items
            .iter()
            .filter_map(|item| {
                let title = clean_fragment(str_field(item, "title"));
                let link = str_field(item, "link");
                if title.is_empty() || link.is_empty() {
                    return None;
                }

                let score = item.get("score").and_then(Value::as_i64).unwrap_or(0);
                let answers = item.get("answer_count").and_then(Value::as_u64).unwrap_or(0);
                let tags: Vec<&str> = item
                    .get("tags")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .collect();

                let owner = item
                    .pointer("/owner/display_name")
                    .and_then(Value::as_str)
                    .map(clean_fragment)
                    .unwrap_or_default();
                let mut snippet = snippet_of(&[
                    format!("{} votes", score),
                    format!("{} answers", answers),
                    if owner.is_empty() { owner } else { format!("asked by {}", owner) },
                    match id_field(item, "question_id") {
                        id if id.is_empty() => id,
                        id => format!("question {}", id),
                    },
                ]);
                if !tags.is_empty() {
                    snippet.push_str(&format!(" [{}]", tags.join(", ")));
                }

                Some(SearchResult::new(title, link, snippet, Self::NAME))
            })
            .take(limit)
            .collect())
    }
}

/// Reddit search, only for opinion and discussion queries
pub struct SocialSource {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl SocialSource {
    pub const NAME: &'static str = "reddit";

    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SearchSource for SocialSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn applies_to(&self, query: &str) -> bool {
        is_opinion_query(query)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let limit_param = limit.to_string();
        let url = endpoint_url(
            Self::NAME,
            &self.base_url,
            "/search.json",
            &[("q", query), ("limit", limit_param.as_str()), ("sort", "relevance")],
        )?;

        let json: Value = self.http.get_json(&url, &RequestOptions::new(self.timeout)).await?;
        let posts = json
            .pointer("/data/children")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::parse(Self::NAME, "missing data.children"))?;

        Ok(posts
            .iter()
            .filter_map(|child| {
                let post = child.get("data")?;
                let title = str_field(post, "title");
                let permalink = str_field(post, "permalink");
                if title.is_empty() || permalink.is_empty() {
                    return None;
                }

                let body = clean_fragment(str_field(post, "selftext"));
                let snippet = if body.is_empty() {
                    let score = post.get("score").and_then(Value::as_i64).unwrap_or(0);
                    let author = str_field(post, "author");
                    snippet_of(&[
                        format!("r/{}", str_field(post, "subreddit")),
                        format!("{} points", score),
                        if author.is_empty() { String::new() } else { format!("posted by u/{}", author) },
                        match id_field(post, "id") {
                            id if id.is_empty() => id,
                            id => format!("post {}", id),
                        },
                    ])
                } else {
                    truncate_chars(&body, POST_SNIPPET_CHARS)
                };

                Some(SearchResult::new(
                    title,
                    format!("{}{}", self.base_url, permalink),
                    snippet,
                    Self::NAME,
                ))
            })
            .take(limit)
            .collect())
    }
}

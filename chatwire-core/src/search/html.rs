//! HTML scraping helpers for search result pages and fetched documents

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// One result block scraped from a search results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBlock {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid CSS selector")
}

static RESULT_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector(".result, .web-result"));
static RESULT_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("a.result__a"));
static RESULT_SNIPPET: LazyLock<Selector> = LazyLock::new(|| selector(".result__snippet"));
static PAGE_TEXT: LazyLock<Selector> =
    LazyLock::new(|| selector("h1, h2, h3, h4, p, li, pre, blockquote, td"));

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a[^>]*class="[^"]*result__a[^"]*"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
        .expect("Invalid anchor pattern")
});
static ANCHOR_HREF_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a[^>]*href="([^"]+)"[^>]*class="[^"]*result__a[^"]*"[^>]*>(.*?)</a>"#)
        .expect("Invalid anchor pattern")
});
static SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(?:a|div|td)[^>]*class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("Invalid snippet pattern")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid tag pattern"));
static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(?:script|style|noscript)>")
        .expect("Invalid script pattern")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace pattern"));

/// Extract result blocks from a search results page.
///
/// Tries CSS result blocks first and falls back to pairing result anchors
/// with snippets by position when no block yields a result.
pub fn parse_search_result_blocks(html: &str) -> Vec<ResultBlock> {
    let blocks = parse_with_selectors(html);
    if !blocks.is_empty() {
        return blocks;
    }

    let blocks = parse_with_patterns(html);
    if !blocks.is_empty() {
        debug!("Result page parsed with pattern fallback ({} blocks)", blocks.len());
    }
    blocks
}

fn parse_with_selectors(html: &str) -> Vec<ResultBlock> {
    let document = Html::parse_document(html);

    document
        .select(&RESULT_BLOCK)
        .filter_map(|block| {
            let anchor = block.select(&RESULT_TITLE).next()?;
            let url = decode_result_url(anchor.value().attr("href")?)?;
            let title = element_text(&anchor);
            if title.is_empty() {
                return None;
            }

            let snippet = block
                .select(&RESULT_SNIPPET)
                .next()
                .map(|s| element_text(&s))
                .unwrap_or_default();

            Some(ResultBlock {
                title,
                url,
                snippet,
            })
        })
        .collect()
}

fn parse_with_patterns(html: &str) -> Vec<ResultBlock> {
    let mut positioned: Vec<(usize, String, String)> = ANCHOR
        .captures_iter(html)
        .chain(ANCHOR_HREF_FIRST.captures_iter(html))
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            Some((start, caps[1].to_string(), clean_fragment(&caps[2])))
        })
        .collect();
    positioned.sort_by_key(|(start, _, _)| *start);

    let anchors: Vec<(String, String)> = positioned
        .into_iter()
        .map(|(_, href, title)| (href, title))
        .collect();
    let snippets: Vec<String> = SNIPPET
        .captures_iter(html)
        .map(|caps| clean_fragment(&caps[1]))
        .collect();

    anchors
        .into_iter()
        .enumerate()
        .filter_map(|(i, (href, title))| {
            let url = decode_result_url(&href)?;
            (!title.is_empty()).then(|| ResultBlock {
                title,
                url,
                snippet: snippets.get(i).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Resolve a result link to the target URL.
///
/// Redirect links of the form `//duckduckgo.com/l/?uddg=<encoded>` are
/// unwrapped; other absolute http(s) links pass through; anything else is
/// dropped.
pub fn decode_result_url(href: &str) -> Option<String> {
    let href = decode_entities(href.trim());
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href
    };

    let parsed = Url::parse(&absolute).ok()?;
    if let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg") {
        return Some(target.into_owned()).filter(|t| t.starts_with("http"));
    }

    matches!(parsed.scheme(), "http" | "https").then_some(absolute)
}

/// Strip markup from an HTML fragment and normalize whitespace
pub fn clean_fragment(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, " ");
    collapse_whitespace(&decode_entities(&without_tags))
}

/// Readable text of a fetched page, truncated to `max_chars` characters
pub fn extract_page_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let pieces: Vec<String> = document
        .select(&PAGE_TEXT)
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
        .collect();

    let text = if pieces.is_empty() {
        clean_fragment(&SCRIPT_OR_STYLE.replace_all(html, " "))
    } else {
        pieces.join("\n")
    };

    text.chars().take(max_chars).collect()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r##"
        <html><body>
        <div class="result results_links results_links_deep web-result">
          <h2 class="result__title">
            <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust <b>Programming</b> Language</a>
          </h2>
          <a class="result__snippet" href="#">A language empowering everyone to build <b>reliable</b> software.</a>
        </div>
        <div class="result web-result">
          <h2 class="result__title">
            <a class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
          </h2>
          <a class="result__snippet">The Rust Programming Language book.</a>
        </div>
        <div class="result result--ad"><a class="result__a" href="/y.js?ad=1">Ad</a></div>
        </body></html>
    "##;

    #[test]
    fn test_selector_strategy() {
        let blocks = parse_search_result_blocks(RESULTS_PAGE);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].title, "Rust Programming Language");
        assert_eq!(blocks[0].url, "https://www.rust-lang.org/");
        assert_eq!(
            blocks[0].snippet,
            "A language empowering everyone to build reliable software."
        );
        assert_eq!(blocks[1].url, "https://doc.rust-lang.org/book/");
    }

    #[test]
    fn test_pattern_fallback_without_blocks() {
        let html = r#"
            <a class="result__a" href="https://example.com/one">First &amp; best</a>
            <td class="result__snippet">Snippet <b>one</b></td>
            <a href="https://example.com/two" class="result__a">Second</a>
        "#;
        let blocks = parse_search_result_blocks(html);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].title, "First & best");
        assert_eq!(blocks[0].snippet, "Snippet one");
        assert_eq!(blocks[1].url, "https://example.com/two");
        assert_eq!(blocks[1].snippet, "");
    }

    #[test]
    fn test_no_results() {
        assert!(parse_search_result_blocks("<html><body>No results.</body></html>").is_empty());
    }

    #[test]
    fn test_decode_result_url() {
        assert_eq!(
            decode_result_url("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&rut=x")
                .as_deref(),
            Some("https://example.com/a?b=1")
        );
        assert_eq!(
            decode_result_url("https://example.com/").as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(decode_result_url("/relative/path"), None);
        assert_eq!(decode_result_url("javascript:void(0)"), None);
    }

    #[test]
    fn test_clean_fragment() {
        assert_eq!(
            clean_fragment("<span class=\"searchmatch\">Rust</span> (programming&nbsp;language)"),
            "Rust (programming language)"
        );
    }

    #[test]
    fn test_extract_page_text() {
        let html = r#"<html><head><script>var x = 1;</script></head>
            <body><h1>Title</h1><p>First   paragraph.</p><p>Second.</p></body></html>"#;
        assert_eq!(extract_page_text(html, 2000), "Title\nFirst paragraph.\nSecond.");
        assert_eq!(extract_page_text(html, 5), "Title");

        let bare = "<div>Only <b>div</b> text</div><style>p{}</style>";
        assert_eq!(extract_page_text(bare, 100), "Only div text");
    }
}

//! Query intent classification and argument extraction

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// What a query is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Time,
    Weather,
    Currency,
    News,
    Search,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::Time => "time",
            Intent::Weather => "weather",
            Intent::Currency => "currency",
            Intent::News => "news",
            Intent::Search => "search",
        };
        f.write_str(name)
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("Invalid intent pattern"))
        .collect()
}

/// Pattern groups in evaluation order
static INTENT_GROUPS: LazyLock<Vec<(Intent, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (
            Intent::Time,
            compile(&[
                r"(?i)\bwhat(?:'s|\s+is)?\s+the\s+time\b",
                r"(?i)\bwhat\s+time\s+is\s+it\b",
                r"(?i)\b(?:current|local)\s+time\b",
                r"(?i)\btime\s+(?:in|at)\s+\p{L}",
                r"(?i)\btime\s*zone\b",
            ]),
        ),
        (
            Intent::Weather,
            compile(&[
                r"(?i)\b(?:weather|forecast|temperature|humidity)\b",
                r"(?i)\bis\s+it\s+(?:raining|snowing|sunny|cold|hot)\b",
            ]),
        ),
        (
            Intent::Currency,
            compile(&[
                r"(?i)\bexchange\s+rates?\b",
                r"(?i)\bconvert\s+\d",
                r"(?i)\b\d+(?:[.,]\d+)?\s*[a-z]{3}\s+(?:to|in|into)\s+[a-z]{3}\b",
                r"(?i)\b(?:usd|eur|gbp|jpy|rub|cny|inr|chf|cad|aud|uah|kzt|krw)\s+(?:to|in|into)\s+[a-z]{3}\b",
                r"(?i)\b(?:dollars?|euros?|pounds?|yen|rubles?|roubles?|yuan|rupees?|francs?)\s+(?:to|in|into)\s+\p{L}+",
                r"[$€£¥₽]\s*\d",
            ]),
        ),
        (
            Intent::News,
            compile(&[
                r"(?i)\b(?:news|headlines?)\b",
                r"(?i)\b(?:breaking|latest)\s+(?:on|about)\b",
            ]),
        ),
    ]
});

/// Maps free text to an [`Intent`]; total over all inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// First group with a matching pattern wins; anything else is a search
    pub fn classify(&self, query: &str) -> Intent {
        let query = query.trim();
        if query.is_empty() {
            return Intent::Search;
        }

        INTENT_GROUPS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(query)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Search)
    }
}

static LOCATION_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:in|at|for)\s+(\p{L}[\p{L}\s.'-]*?)\s*(?:\b(?:today|tomorrow|tonight|right\s+now|now|this\s+week)\b)?\s*[?.!]*$",
    )
    .expect("Invalid location pattern")
});

static LOCATION_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\p{L}[\p{L}\s.'-]*?)\s+(?:weather|forecast|temperature|time)\b")
        .expect("Invalid location pattern")
});

/// Filler words that never start a place name or topic
const FILLER_WORDS: &[&str] = &[
    "what", "what's", "whats", "is", "the", "current", "local", "how", "tell", "me", "today's",
    "todays", "latest", "top", "show", "get", "a", "an", "any",
];

/// Drop leading filler words; `None` when nothing else remains
fn strip_filler(text: &str) -> Option<String> {
    let words: Vec<&str> = text
        .split_whitespace()
        .skip_while(|w| FILLER_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    let joined = words.join(" ");
    let trimmed = joined.trim_matches(|c: char| c.is_ascii_punctuation() && c != '.');
    let trimmed = trimmed.trim_end_matches('.');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Place named by a time or weather query.
///
/// Handles both "weather in Tokyo" and "Tokyo weather" forms.
pub fn extract_location(query: &str) -> Option<String> {
    let query = query.trim();

    if let Some(caps) = LOCATION_AFTER.captures(query) {
        if let Some(location) = strip_filler(&caps[1]) {
            return Some(location);
        }
    }

    LOCATION_BEFORE
        .captures(query)
        .and_then(|caps| strip_filler(&caps[1]))
}

/// A parsed currency conversion request
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyQuery {
    pub amount: f64,
    /// ISO 4217 code of the source currency
    pub from: String,
    /// ISO 4217 code of the target currency
    pub to: String,
}

/// Currency names, symbols and codes accepted in queries
const CURRENCY_ALIASES: &[(&str, &str)] = &[
    ("usd", "USD"),
    ("dollar", "USD"),
    ("dollars", "USD"),
    ("$", "USD"),
    ("eur", "EUR"),
    ("euro", "EUR"),
    ("euros", "EUR"),
    ("€", "EUR"),
    ("gbp", "GBP"),
    ("pound", "GBP"),
    ("pounds", "GBP"),
    ("£", "GBP"),
    ("jpy", "JPY"),
    ("yen", "JPY"),
    ("¥", "JPY"),
    ("rub", "RUB"),
    ("ruble", "RUB"),
    ("rubles", "RUB"),
    ("rouble", "RUB"),
    ("roubles", "RUB"),
    ("₽", "RUB"),
    ("cny", "CNY"),
    ("yuan", "CNY"),
    ("rmb", "CNY"),
    ("inr", "INR"),
    ("rupee", "INR"),
    ("rupees", "INR"),
    ("chf", "CHF"),
    ("franc", "CHF"),
    ("francs", "CHF"),
    ("cad", "CAD"),
    ("aud", "AUD"),
    ("uah", "UAH"),
    ("hryvnia", "UAH"),
    ("kzt", "KZT"),
    ("tenge", "KZT"),
    ("krw", "KRW"),
    ("pln", "PLN"),
    ("zloty", "PLN"),
    ("sek", "SEK"),
    ("nok", "NOK"),
    ("brl", "BRL"),
    ("mxn", "MXN"),
    ("lira", "TRY"),
];

static CURRENCY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}+|[$€£¥₽]").expect("Invalid currency token pattern"));

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("Invalid amount pattern"));

fn currency_code(token: &str) -> Option<&'static str> {
    let token = token.to_lowercase();
    CURRENCY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, code)| *code)
}

/// Parse "100 usd to eur", "convert 5 euros into dollars" and similar.
///
/// The first two distinct currencies are taken as source and target; the
/// amount defaults to 1.
pub fn parse_currency_query(query: &str) -> Option<CurrencyQuery> {
    let mut codes: Vec<&'static str> = Vec::with_capacity(2);
    for token in CURRENCY_TOKEN.find_iter(query) {
        if let Some(code) = currency_code(token.as_str()) {
            if !codes.contains(&code) {
                codes.push(code);
            }
            if codes.len() == 2 {
                break;
            }
        }
    }

    let [from, to] = codes[..] else {
        return None;
    };

    let amount = AMOUNT
        .find(query)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .filter(|a| *a > 0.0)
        .unwrap_or(1.0);

    Some(CurrencyQuery {
        amount,
        from: from.to_string(),
        to: to.to_string(),
    })
}

static TOPIC_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:news|headlines?)\s+(?:about|on|for|regarding|in)\s+(.+?)[?.!]*$")
        .expect("Invalid topic pattern")
});

static TOPIC_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(.+?)\s+(?:news|headlines?)\b").expect("Invalid topic pattern")
});

/// Topic named by a news query, or `None` for general headlines
pub fn extract_news_topic(query: &str) -> Option<String> {
    let query = query.trim();

    TOPIC_AFTER
        .captures(query)
        .and_then(|caps| strip_filler(&caps[1]))
        .or_else(|| {
            TOPIC_BEFORE
                .captures(query)
                .and_then(|caps| strip_filler(&caps[1]))
        })
}

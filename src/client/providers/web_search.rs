use super::traits::SearchAdapter;
use crate::client::{get_json, records_at, RawRecord};
use crate::config::Config;
use crate::resilience::{RetryEngine, RetryPolicy};
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::ops::RangeInclusive;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

static YEAR_PATTERN: OnceLock<Regex> = OnceLock::new();
static AUTHOR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn year_pattern() -> &'static Regex {
    YEAR_PATTERN.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year regex must compile"))
}

fn author_pattern() -> &'static Regex {
    AUTHOR_PATTERN.get_or_init(|| {
        Regex::new(r"[A-Z][a-z]+ [A-Z][a-z]+(?:, [A-Z][a-z]+ [A-Z][a-z]+)*")
            .expect("author regex must compile")
    })
}

/// Google Custom Search over scholarly sites, used only as the last resort.
///
/// Results are web pages, not bibliographic records, so each hit is reshaped
/// into a paper-like object before it leaves the adapter.
pub struct WebSearchAdapter {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: String,
    timeout: Duration,
    engine: RetryEngine,
}

impl WebSearchAdapter {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        engine_id: impl Into<String>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            engine_id: engine_id.into(),
            timeout,
            engine: RetryEngine::new(policy),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config, client: Client) -> Self {
        let engine_id = config
            .credentials
            .get("GOOGLE_CSE_ID")
            .unwrap_or(config.sources.web_search_engine_id.as_str())
            .to_string();
        Self::new(
            client,
            &config.sources.web_search_url,
            config.credentials.get("GOOGLE_API_KEY").map(str::to_string),
            engine_id,
            config.sources.timeout(),
            RetryPolicy::from(&config.retry),
        )
    }
}

/// Turn one Custom Search item into `{title, url, abstract, source, year, authors, journal_name}`
#[must_use]
pub fn reshape_item(item: &Value) -> Value {
    let field = |key: &str| item.get(key).and_then(Value::as_str).unwrap_or_default();
    let snippet = field("snippet");
    let display_link = field("displayLink");

    json!({
        "title": field("title"),
        "url": field("link"),
        "abstract": snippet,
        "source": display_link,
        "year": year_pattern().find(snippet).map_or("", |m| m.as_str()),
        "authors": author_pattern().find(snippet).map_or("", |m| m.as_str()),
        "journal_name": journal_from_host(display_link),
    })
}

/// Best-effort publisher name from a result's display host
#[must_use]
pub fn journal_from_host(display_link: &str) -> String {
    let known = [
        ("arxiv.org", "arXiv"),
        ("scholar.google.com", "Google Scholar"),
        ("ieee.org", "IEEE"),
        ("acm.org", "ACM"),
        ("springer.com", "Springer"),
    ];
    if let Some((_, name)) = known.iter().find(|(host, _)| display_link.contains(host)) {
        return (*name).to_string();
    }

    let label = display_link
        .trim_start_matches("www.")
        .split('.')
        .next()
        .unwrap_or_default();
    let mut chars = label.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

#[async_trait]
impl SearchAdapter for WebSearchAdapter {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Google Custom Search restricted to scholarly sites"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() && !self.engine_id.trim().is_empty()
    }

    fn limit_range(&self) -> RangeInclusive<u32> {
        1..=10
    }

    fn retry_engine(&self) -> &RetryEngine {
        &self.engine
    }

    async fn fetch(&self, query: &str, limit: u32) -> Result<Vec<RawRecord>> {
        debug!("Searching the web for: {}", query);

        let q = format!("\"{query}\" filetype:pdf OR site:scholar.google.com OR site:arxiv.org");
        let num = limit.to_string();
        let request = self.client.get(&self.endpoint).query(&[
            ("key", self.api_key.as_deref().unwrap_or_default()),
            ("cx", self.engine_id.as_str()),
            ("q", q.as_str()),
            ("num", num.as_str()),
            ("safe", "off"),
            ("fields", "items(title,link,snippet,displayLink)"),
        ]);

        let body = get_json(request, self.name(), self.timeout).await?;
        Ok(records_at(body, "/items").iter().map(reshape_item).collect())
    }
}

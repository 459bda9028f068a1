use super::traits::SearchAdapter;
use crate::client::{get_json, records_at, RateLimiter, RawRecord};
use crate::config::Config;
use crate::resilience::{RetryEngine, RetryPolicy};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::debug;

const FIELDS: &str = "title,authors,year,abstract,journal,url,externalIds,venue,publicationDate";

/// Semantic Scholar Graph API paper search.
///
/// Requires `S2_API_KEY`; the public quota is one request per second, so
/// every call is followed by a one-second pause.
pub struct SemanticScholarAdapter {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    engine: RetryEngine,
    limiter: RateLimiter,
}

impl SemanticScholarAdapter {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
            engine: RetryEngine::new(policy),
            limiter: RateLimiter::new(1.0),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::new(
            client,
            &config.sources.semantic_scholar_url,
            config.credentials.get("S2_API_KEY").map(str::to_string),
            config.sources.timeout(),
            RetryPolicy::from(&config.retry),
        )
    }

    /// Replace the post-call pacing, e.g. to disable it in tests
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }
}

#[async_trait]
impl SearchAdapter for SemanticScholarAdapter {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    fn description(&self) -> &str {
        "Semantic Scholar - AI-curated index of scientific literature"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn limit_range(&self) -> RangeInclusive<u32> {
        1..=100
    }

    fn retry_engine(&self) -> &RetryEngine {
        &self.engine
    }

    fn rate_limiter(&self) -> Option<&RateLimiter> {
        Some(&self.limiter)
    }

    async fn fetch(&self, query: &str, limit: u32) -> Result<Vec<RawRecord>> {
        debug!("Searching Semantic Scholar for: {}", query);

        let mut request = self.client.get(&self.endpoint).query(&[
            ("query", query),
            ("limit", &limit.to_string()),
            ("sort", "publicationDate:desc"),
            ("fields", FIELDS),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let body = get_json(request, self.name(), self.timeout).await?;
        Ok(records_at(body, "/data"))
    }
}

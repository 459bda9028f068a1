use super::traits::SearchAdapter;
use crate::client::{get_json, records_at, RawRecord};
use crate::config::Config;
use crate::resilience::{RetryEngine, RetryPolicy};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::debug;

/// Crossref REST API works search.
///
/// Needs no key, so it is always configured. `CONTACT_EMAIL`, when set, is
/// sent as `mailto` to get routed to Crossref's "polite" pool.
pub struct CrossrefAdapter {
    client: Client,
    endpoint: String,
    contact_email: Option<String>,
    timeout: Duration,
    engine: RetryEngine,
}

impl CrossrefAdapter {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        contact_email: Option<String>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            contact_email,
            timeout,
            engine: RetryEngine::new(policy),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::new(
            client,
            &config.sources.crossref_url,
            config.credentials.get("CONTACT_EMAIL").map(str::to_string),
            config.sources.timeout(),
            RetryPolicy::from(&config.retry),
        )
    }
}

#[async_trait]
impl SearchAdapter for CrossrefAdapter {
    fn name(&self) -> &str {
        "crossref"
    }

    fn description(&self) -> &str {
        "Crossref - DOI registration agency metadata"
    }

    fn limit_range(&self) -> RangeInclusive<u32> {
        1..=1000
    }

    fn retry_engine(&self) -> &RetryEngine {
        &self.engine
    }

    async fn fetch(&self, query: &str, limit: u32) -> Result<Vec<RawRecord>> {
        debug!("Searching Crossref for: {}", query);

        let rows = limit.to_string();
        let mut params = vec![
            ("query", query),
            ("rows", rows.as_str()),
            ("sort", "published"),
            ("order", "desc"),
        ];
        if let Some(email) = &self.contact_email {
            params.push(("mailto", email.as_str()));
        }

        let request = self.client.get(&self.endpoint).query(&params);
        let body = get_json(request, self.name(), self.timeout).await?;
        Ok(records_at(body, "/message/items"))
    }
}

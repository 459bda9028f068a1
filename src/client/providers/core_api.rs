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

/// CORE v3 works search (open-access aggregator), bearer-token authenticated
pub struct CoreAdapter {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    engine: RetryEngine,
}

impl CoreAdapter {
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
        }
    }

    #[must_use]
    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::new(
            client,
            &config.sources.core_url,
            config.credentials.get("CORE_API_KEY").map(str::to_string),
            config.sources.timeout(),
            RetryPolicy::from(&config.retry),
        )
    }
}

#[async_trait]
impl SearchAdapter for CoreAdapter {
    fn name(&self) -> &str {
        "core"
    }

    fn description(&self) -> &str {
        "CORE - aggregated open access research outputs"
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

    async fn fetch(&self, query: &str, limit: u32) -> Result<Vec<RawRecord>> {
        debug!("Searching CORE for: {}", query);

        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("limit", &limit.to_string())]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body = get_json(request, self.name(), self.timeout).await?;
        Ok(records_at(body, "/results"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> CoreAdapter {
        CoreAdapter::new(
            Client::new(),
            format!("{}/v3/search/works", server.uri()),
            Some("core-key".to_string()),
            Duration::from_secs(5),
            RetryPolicy::immediate(3),
        )
    }

    #[tokio::test]
    async fn test_bearer_auth_and_results_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer core-key"))
            .and(query_param("q", "wetland restoration"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalHits": 1,
                "results": [{"title": "Wetlands", "yearPublished": 2020}]
            })))
            .mount(&server)
            .await;

        let records = adapter(&server).search("wetland restoration", 250).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["yearPublished"], 2020);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        assert!(adapter(&server).search("wetland", 5).await.is_empty());
    }
}

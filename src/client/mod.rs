pub mod cache;
pub mod orchestrator;
pub mod providers;
pub mod rate_limiter;

pub use cache::SearchCache;
pub use orchestrator::{FallbackOrchestrator, Retrieval, RetrievalMode, SourceCount};
pub use rate_limiter::RateLimiter;

use crate::config::SourcesConfig;
use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A record exactly as one provider returned it: any JSON shape at all
pub type RawRecord = serde_json::Value;

/// A raw record tagged with the adapter that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedRecord {
    pub source: String,
    pub raw: RawRecord,
}

impl SourcedRecord {
    #[must_use]
    pub fn new(source: impl Into<String>, raw: RawRecord) -> Self {
        Self {
            source: source.into(),
            raw,
        }
    }
}

/// HTTP client configuration for the search adapters
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&SourcesConfig::default())
    }
}

impl From<&SourcesConfig> for HttpClientConfig {
    fn from(sources: &SourcesConfig) -> Self {
        Self {
            timeout: sources.timeout(),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: sources.user_agent.clone(),
        }
    }
}

impl HttpClientConfig {
    /// Build the pooled client shared by every adapter
    pub fn build(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .gzip(true)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| Error::InvalidInput {
                field: "http_client".to_string(),
                reason: format!("Failed to create HTTP client: {e}"),
            })
    }
}

/// Send a GET and decode its JSON body, mapping HTTP status onto the error taxonomy.
///
/// 429 becomes `RateLimitExceeded`, 5xx `ServiceUnavailable`, 401/403
/// `AuthenticationFailed`, any other non-success `UnexpectedStatus`.
pub async fn get_json(
    request: reqwest::RequestBuilder,
    service: &str,
    timeout: Duration,
) -> Result<serde_json::Value> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::from_request(e, service, timeout))?;

    let status = response.status();
    if status.is_success() {
        debug!("{} responded {}", service, status);
        return response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| Error::from_request(e, service, timeout));
    }

    warn!("{} API error: {}", service, status);
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimitExceeded {
            retry_after: retry_after(&response).unwrap_or(Duration::ZERO),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::AuthenticationFailed(format!("{service}: API key invalid or expired"))
        }
        s if s.is_server_error() => Error::ServiceUnavailable {
            service: service.to_string(),
            reason: format!("HTTP {s}"),
        },
        s => Error::UnexpectedStatus {
            service: service.to_string(),
            status: s.as_u16(),
        },
    })
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Pull the record list out of a provider envelope (`/data`, `/message/items`, ...)
pub fn records_at(mut body: serde_json::Value, pointer: &str) -> Vec<RawRecord> {
    match body.pointer_mut(pointer).map(serde_json::Value::take) {
        Some(serde_json::Value::Array(records)) => records,
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(
                "Expected a list at '{}', found {}",
                pointer,
                json_kind(&other)
            );
            Vec::new()
        }
    }
}

pub(crate) const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_records_at_envelopes() {
        let body = json!({"message": {"items": [{"DOI": "10.1/a"}, {"DOI": "10.1/b"}]}});
        assert_eq!(records_at(body, "/message/items").len(), 2);

        let body = json!({"data": null});
        assert!(records_at(body, "/data").is_empty());

        let body = json!({"results": {"oops": true}});
        assert!(records_at(body, "/results").is_empty());

        assert!(records_at(json!({}), "/data").is_empty());
    }

    #[test]
    fn test_http_client_config_from_sources() {
        let sources = SourcesConfig {
            timeout_secs: 3,
            ..SourcesConfig::default()
        };
        let config = HttpClientConfig::from(&sources);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.build().is_ok());
    }

    #[tokio::test]
    async fn test_get_json_maps_status_codes() {
        let server = MockServer::start().await;
        for (route, status) in [("/limited", 429), ("/down", 503), ("/forbidden", 403), ("/gone", 410)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }

        let client = Client::new();
        let timeout = Duration::from_secs(5);
        let call = |route: &str| get_json(client.get(format!("{}{route}", server.uri())), "test", timeout);

        assert!(matches!(call("/limited").await, Err(Error::RateLimitExceeded { .. })));
        assert!(matches!(call("/down").await, Err(Error::ServiceUnavailable { .. })));
        assert!(matches!(call("/forbidden").await, Err(Error::AuthenticationFailed(_))));
        assert!(matches!(
            call("/gone").await,
            Err(Error::UnexpectedStatus { status: 410, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_json_connection_refused_is_transient() {
        let client = Client::new();
        let result = get_json(
            client.get("http://127.0.0.1:9/unreachable"),
            "test",
            Duration::from_secs(2),
        )
        .await;

        let error = result.unwrap_err();
        assert!(error.is_retryable(), "unexpected error: {error}");
    }
}

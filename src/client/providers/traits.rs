use crate::client::{RateLimiter, RawRecord};
use crate::resilience::{Attempt, RetryEngine};
use crate::Result;
use async_trait::async_trait;
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

/// A search backend queried by keyword and answering with raw JSON records.
///
/// Implementors supply [`fetch`](SearchAdapter::fetch), a single HTTP round
/// trip; the provided [`search`](SearchAdapter::search) wraps it with input
/// checks, limit clamping, retries and post-call pacing, and never fails.
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    /// Unique name/identifier for this adapter
    fn name(&self) -> &str;

    /// Human-readable description of the adapter
    fn description(&self) -> &str;

    /// Whether the credentials this adapter needs are present
    fn is_configured(&self) -> bool {
        true
    }

    /// Accepted values of the provider's page-size parameter
    fn limit_range(&self) -> RangeInclusive<u32>;

    fn retry_engine(&self) -> &RetryEngine;

    /// Pacing applied after every call, on top of any backoff
    fn rate_limiter(&self) -> Option<&RateLimiter> {
        None
    }

    /// Perform exactly one request and unwrap the provider envelope
    async fn fetch(&self, query: &str, limit: u32) -> Result<Vec<RawRecord>>;

    /// Search with retries; an empty list means the source produced nothing
    async fn search(&self, query: &str, limit: u32) -> Vec<RawRecord> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Empty query provided to {} search", self.name());
            return Vec::new();
        }
        if !self.is_configured() {
            warn!("{} is not configured, skipping", self.name());
            return Vec::new();
        }

        let range = self.limit_range();
        let limit = limit.clamp(*range.start(), *range.end());

        let records = self
            .retry_engine()
            .run(self.name(), || async move {
                let result = self.fetch(query, limit).await;
                if let Some(limiter) = self.rate_limiter() {
                    limiter.cool_down().await;
                }
                Attempt::from(result)
            })
            .await;

        info!("{}: retrieved {} records", self.name(), records.len());
        records
    }
}

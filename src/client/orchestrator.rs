use crate::client::providers::{
    CoreAdapter, CrossrefAdapter, SearchAdapter, SemanticScholarAdapter, WebSearchAdapter,
};
use crate::client::{RawRecord, SearchCache, SourcedRecord};
use crate::config::Config;
use crate::resilience::run_bounded;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How complete a retrieval turned out to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Every primary source returned records
    Complete,
    /// Some primaries failed; the rest were accepted without escalation
    Degraded { succeeded: usize },
    /// All primaries failed and the fallback supplied the records
    Fallback,
    /// Nothing from anywhere
    Exhausted,
}

/// Records returned by one adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

/// Merged working set from one `collect` call
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub records: Vec<SourcedRecord>,
    /// Per-adapter counts in call order (the fallback last, when it ran)
    pub per_source: Vec<SourceCount>,
    /// Primary adapters that produced nothing
    pub api_failures: usize,
    pub mode: RetrievalMode,
    pub elapsed: Duration,
}

impl Retrieval {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Queries the primary sources and escalates to the fallback only when all of them fail.
pub struct FallbackOrchestrator {
    primaries: Vec<Arc<dyn SearchAdapter>>,
    fallback: Option<Arc<dyn SearchAdapter>>,
    limit: u32,
    fallback_limit: u32,
    max_concurrent: usize,
    cache: Option<Arc<SearchCache>>,
}

impl FallbackOrchestrator {
    pub fn new(
        primaries: Vec<Arc<dyn SearchAdapter>>,
        fallback: Option<Arc<dyn SearchAdapter>>,
        limit: u32,
    ) -> Self {
        Self {
            primaries,
            fallback,
            limit,
            fallback_limit: limit,
            max_concurrent: 5,
            cache: None,
        }
    }

    /// Standard wiring: Semantic Scholar, CORE, Crossref, then web search
    #[must_use]
    pub fn from_config(config: &Config, client: &Client) -> Self {
        let primaries: Vec<Arc<dyn SearchAdapter>> = vec![
            Arc::new(SemanticScholarAdapter::from_config(config, client.clone())),
            Arc::new(CoreAdapter::from_config(config, client.clone())),
            Arc::new(CrossrefAdapter::from_config(config, client.clone())),
        ];
        let fallback = config.sources.enable_web_fallback.then(|| {
            Arc::new(WebSearchAdapter::from_config(config, client.clone())) as Arc<dyn SearchAdapter>
        });

        info!(
            "Initialized orchestrator with {} primary sources (fallback: {})",
            primaries.len(),
            fallback.is_some()
        );

        let cache = (config.sources.cache_ttl_secs > 0).then(|| {
            Arc::new(SearchCache::new(
                Duration::from_secs(config.sources.cache_ttl_secs),
                config.sources.cache_max_entries,
            ))
        });

        Self {
            primaries,
            fallback,
            limit: config.sources.limit,
            fallback_limit: config.sources.web_search_limit,
            max_concurrent: config.sources.max_concurrent,
            cache,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<SearchCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<SearchCache>> {
        self.cache.as_ref()
    }

    #[must_use]
    pub const fn with_fallback_limit(mut self, limit: u32) -> Self {
        self.fallback_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Names of the primary adapters, in call order
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        self.primaries.iter().map(|a| a.name().to_string()).collect()
    }

    /// Query every primary in turn, escalating to the fallback when all come back empty
    pub async fn collect(&self, query: &str) -> Retrieval {
        let started = Instant::now();
        let mut results = Vec::with_capacity(self.primaries.len());
        for adapter in &self.primaries {
            let records = self.search(adapter.as_ref(), query, self.limit).await;
            results.push((adapter.name().to_string(), records));
        }
        self.merge(query, results, started).await
    }

    /// Same contract as [`collect`](Self::collect), with the primaries queried concurrently
    pub async fn collect_concurrent(&self, query: &str) -> Retrieval {
        let started = Instant::now();
        let tasks = self
            .primaries
            .iter()
            .map(|adapter| async move {
                let records = self.search(adapter.as_ref(), query, self.limit).await;
                (adapter.name().to_string(), records)
            })
            .collect();
        let results = run_bounded(tasks, self.max_concurrent).await;
        self.merge(query, results, started).await
    }

    async fn merge(
        &self,
        query: &str,
        results: Vec<(String, Vec<RawRecord>)>,
        started: Instant,
    ) -> Retrieval {
        let mut records = Vec::new();
        let mut per_source = Vec::with_capacity(results.len() + 1);
        let mut api_failures = 0;

        for (source, batch) in results {
            if batch.is_empty() {
                api_failures += 1;
            }
            per_source.push(SourceCount {
                source: source.clone(),
                count: batch.len(),
            });
            records.extend(batch.into_iter().map(|raw| SourcedRecord::new(source.clone(), raw)));
        }

        let attempted = self.primaries.len();
        let mode = if api_failures == attempted {
            warn!("All {} primary sources failed", attempted);
            match self.run_fallback(query).await {
                Some((source, batch)) if !batch.is_empty() => {
                    per_source.push(SourceCount {
                        source: source.clone(),
                        count: batch.len(),
                    });
                    records = batch
                        .into_iter()
                        .map(|raw| SourcedRecord::new(source.clone(), raw))
                        .collect();
                    RetrievalMode::Fallback
                }
                Some((source, _)) => {
                    per_source.push(SourceCount { source, count: 0 });
                    RetrievalMode::Exhausted
                }
                None => RetrievalMode::Exhausted,
            }
        } else if api_failures > 0 {
            warn!(
                "{} of {} sources failed, continuing with the rest",
                api_failures, attempted
            );
            RetrievalMode::Degraded {
                succeeded: attempted - api_failures,
            }
        } else {
            RetrievalMode::Complete
        };

        info!(
            "Retrieved {} records for '{}' ({:?})",
            records.len(),
            query,
            mode
        );

        Retrieval {
            records,
            per_source,
            api_failures,
            mode,
            elapsed: started.elapsed(),
        }
    }

    async fn run_fallback(&self, query: &str) -> Option<(String, Vec<RawRecord>)> {
        let fallback = self.fallback.as_ref().filter(|f| f.is_configured())?;
        info!("Trying {} fallback", fallback.name());
        let records = self.search(fallback.as_ref(), query, self.fallback_limit).await;
        Some((fallback.name().to_string(), records))
    }

    /// One adapter search, answered from the cache when possible
    async fn search(&self, adapter: &dyn SearchAdapter, query: &str, limit: u32) -> Vec<RawRecord> {
        let Some(cache) = &self.cache else {
            return adapter.search(query, limit).await;
        };
        if let Some(records) = cache.get(adapter.name(), query, limit).await {
            return records;
        }
        let records = adapter.search(query, limit).await;
        cache.insert(adapter.name(), query, limit, &records).await;
        records
    }
}

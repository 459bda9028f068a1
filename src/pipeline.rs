//! End-to-end retrieval: validate the topic, collect records from every
//! source, normalize them and curate the candidate set.

use crate::client::{FallbackOrchestrator, HttpClientConfig, Retrieval, RetrievalMode, SourceCount};
use crate::config::Config;
use crate::curator::{is_q1_journal, optimize_query, ResultCurator};
use crate::normalize::{Normalizer, PaperRecord};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

pub const MIN_QUERY_CHARS: usize = 3;
pub const MAX_QUERY_CHARS: usize = 200;

/// Trim a research topic and enforce its length bounds.
///
/// Blank and too-short topics are rejected; overly long ones are truncated.
pub fn validate_query(query: &str) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::InvalidInput {
            field: "query".to_string(),
            reason: "Please provide a research topic".to_string(),
        });
    }

    let chars = query.chars().count();
    if chars < MIN_QUERY_CHARS {
        return Err(Error::InvalidInput {
            field: "query".to_string(),
            reason: format!(
                "Please provide a more detailed research topic (at least {MIN_QUERY_CHARS} characters)"
            ),
        });
    }
    if chars > MAX_QUERY_CHARS {
        warn!("Query very long ({} chars), truncating to {}", chars, MAX_QUERY_CHARS);
        return Ok(query.chars().take(MAX_QUERY_CHARS).collect::<String>().trim_end().to_string());
    }
    Ok(query.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HuntOutcome {
    Papers,
    /// Sources answered but nothing survived curation
    NoRelevantResults,
    /// Every source, fallback included, came back empty
    AllSourcesUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedPaper {
    #[serde(flatten)]
    pub record: PaperRecord,
    pub q1: bool,
}

impl From<PaperRecord> for ReportedPaper {
    fn from(record: PaperRecord) -> Self {
        let q1 = is_q1_journal(&record.journal_name);
        Self { record, q1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntReport {
    pub query: String,
    pub outcome: HuntOutcome,
    pub mode: RetrievalMode,
    pub papers: Vec<ReportedPaper>,
    pub per_source: Vec<SourceCount>,
    pub api_failures: usize,
    /// Raw records before curation
    pub retrieved: usize,
    pub elapsed_ms: u64,
}

pub struct GapHunter {
    orchestrator: FallbackOrchestrator,
    normalizer: Normalizer,
    curator: ResultCurator,
}

impl GapHunter {
    #[must_use]
    pub const fn new(
        orchestrator: FallbackOrchestrator,
        normalizer: Normalizer,
        curator: ResultCurator,
    ) -> Self {
        Self {
            orchestrator,
            normalizer,
            curator,
        }
    }

    /// Wire the standard sources with one shared HTTP client
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = HttpClientConfig::from(&config.sources).build()?;
        Ok(Self::new(
            FallbackOrchestrator::from_config(config, &client),
            Normalizer::new(),
            ResultCurator::from_settings(&config.curator),
        ))
    }

    /// Retrieve and curate papers for a research topic, sources queried in turn
    #[instrument(skip(self))]
    pub async fn hunt(&self, query: &str) -> Result<HuntReport> {
        let query = validate_query(query)?;
        let retrieval = self.orchestrator.collect(&query).await;
        Ok(self.report(query, retrieval, &self.curator))
    }

    /// Like [`hunt`](Self::hunt), with stop words stripped, sources queried
    /// concurrently, duplicate titles collapsed and papers ranked by
    /// [`priority_score`](crate::curator::priority_score) before the cap
    #[instrument(skip(self))]
    pub async fn hunt_optimized(&self, query: &str) -> Result<HuntReport> {
        let query = validate_query(query)?;
        let optimized = optimize_query(&query);
        let search_query = if optimized.is_empty() { query } else { optimized };
        info!("Optimized query: '{}'", search_query);

        let retrieval = self.orchestrator.collect_concurrent(&search_query).await;
        let curator = self
            .curator
            .clone()
            .with_deduplication(true)
            .with_prioritization(true);
        Ok(self.report(search_query, retrieval, &curator))
    }

    fn report(
        &self,
        query: String,
        retrieval: Retrieval,
        curator: &ResultCurator,
    ) -> HuntReport {
        let retrieved = retrieval.records.len();
        let candidates = retrieval
            .records
            .iter()
            .map(|record| self.normalizer.candidate(record))
            .collect();
        let curated = curator.curate(&query, candidates);

        let outcome = if retrieval.mode == RetrievalMode::Exhausted {
            HuntOutcome::AllSourcesUnavailable
        } else if curated.papers.is_empty() {
            HuntOutcome::NoRelevantResults
        } else {
            HuntOutcome::Papers
        };

        info!(
            "Hunt for '{}' finished: {:?}, {} papers",
            query,
            outcome,
            curated.papers.len()
        );

        HuntReport {
            query,
            outcome,
            mode: retrieval.mode,
            papers: curated.papers.into_iter().map(ReportedPaper::from).collect(),
            per_source: retrieval.per_source,
            api_failures: retrieval.api_failures,
            retrieved,
            elapsed_ms: u64::try_from(retrieval.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

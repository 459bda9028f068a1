//! Recency and relevance filtering over normalized candidates.

use crate::config::CuratorSettings;
use crate::normalize::{Candidate, PaperRecord};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, info};

/// Journal-name fragments that mark a top-quartile venue
const Q1_INDICATORS: [&str; 11] = [
    "nature",
    "science",
    "cell",
    "lancet",
    "nejm",
    "jama",
    "ieee transactions",
    "acm transactions",
    "springer",
    "journal of machine learning research",
    "plos one",
];

const STOP_WORDS: [&str; 21] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being",
];

/// Output of one curation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curated {
    pub papers: Vec<PaperRecord>,
    /// Candidates left after the recency filter (or its fallback)
    pub recent: usize,
    /// Candidates that matched the query
    pub relevant: usize,
}

#[derive(Debug, Clone)]
pub struct ResultCurator {
    recency_years: i32,
    recency_fallback: usize,
    min_relevant: usize,
    max_candidates: usize,
    deduplicate: bool,
    prioritize: bool,
    current_year: i32,
}

impl Default for ResultCurator {
    fn default() -> Self {
        Self::from_settings(&CuratorSettings::default())
    }
}

impl ResultCurator {
    #[must_use]
    pub fn from_settings(settings: &CuratorSettings) -> Self {
        Self {
            recency_years: settings.recency_years,
            recency_fallback: settings.recency_fallback,
            min_relevant: settings.min_relevant,
            max_candidates: settings.max_candidates,
            deduplicate: settings.deduplicate,
            prioritize: false,
            current_year: chrono::Utc::now().year(),
        }
    }

    #[must_use]
    pub const fn with_current_year(mut self, current_year: i32) -> Self {
        self.current_year = current_year;
        self
    }

    #[must_use]
    pub const fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    /// Rank by [`priority_score`] before the cap instead of keeping arrival order
    #[must_use]
    pub const fn with_prioritization(mut self, prioritize: bool) -> Self {
        self.prioritize = prioritize;
        self
    }

    /// Filter `candidates` down to at most `max_candidates` papers, keeping
    /// arrival order unless prioritization is on
    pub fn curate(&self, query: &str, candidates: Vec<Candidate>) -> Curated {
        let total = candidates.len();
        let cutoff = self.current_year - self.recency_years;

        let (recent, rest): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| c.published_year.map_or(true, |year| year >= cutoff));

        let recent = if recent.is_empty() && total > 0 {
            debug!(
                "No papers since {}, keeping the first {} regardless of age",
                cutoff, self.recency_fallback
            );
            rest.into_iter().take(self.recency_fallback).collect()
        } else {
            recent
        };

        let terms: Vec<String> = query.to_lowercase().split_whitespace().map(str::to_string).collect();
        let relevant: Vec<&Candidate> = recent.iter().filter(|c| is_relevant(c, &terms)).collect();
        let relevant_count = relevant.len();

        let chosen: Vec<Candidate> = if relevant_count < self.min_relevant {
            debug!(
                "Only {} relevant papers (< {}), using the recency set",
                relevant_count, self.min_relevant
            );
            recent.clone()
        } else {
            relevant.into_iter().cloned().collect()
        };

        let chosen = if self.deduplicate {
            dedup_by_title(chosen, |c| {
                if c.full_title.is_empty() {
                    c.record.title.as_str()
                } else {
                    c.full_title.as_str()
                }
            })
        } else {
            chosen
        };

        let chosen = if self.prioritize {
            prioritize(chosen)
        } else {
            chosen
        };

        let papers: Vec<PaperRecord> = chosen
            .into_iter()
            .take(self.max_candidates)
            .map(|c| c.record)
            .collect();

        info!(
            "Curated {} of {} records ({} recent, {} relevant)",
            papers.len(),
            total,
            recent.len(),
            relevant_count
        );

        Curated {
            papers,
            recent: recent.len(),
            relevant: relevant_count,
        }
    }
}

fn is_relevant(candidate: &Candidate, terms: &[String]) -> bool {
    let title = candidate.full_title.to_lowercase();
    let abstract_text = candidate.abstract_text.to_lowercase();
    if title.is_empty() && abstract_text.is_empty() {
        return true;
    }
    terms
        .iter()
        .any(|term| title.contains(term.as_str()) || abstract_text.contains(term.as_str()))
}

fn title_key(title: &str) -> String {
    title.split_whitespace().collect::<String>().to_lowercase()
}

fn dedup_by_title<T>(items: Vec<T>, title: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(title_key(title(item))))
        .collect()
}

/// Recent, abstracted and well-cited papers score higher (0 to 5)
#[must_use]
pub fn priority_score(candidate: &Candidate) -> u8 {
    let recency = match candidate.published_year {
        Some(year) if year >= 2020 => 2,
        Some(year) if year >= 2015 => 1,
        _ => 0,
    };
    let has_abstract = u8::from(!candidate.abstract_text.is_empty());
    let citations = match candidate.citation_count {
        Some(count) if count > 100 => 2,
        Some(count) if count > 10 => 1,
        _ => 0,
    };
    recency + has_abstract + citations
}

/// Stable sort by descending [`priority_score`]; ties keep arrival order
#[must_use]
pub fn prioritize(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by_key(|c| Reverse(priority_score(c)));
    candidates
}

/// Collapse records whose titles match ignoring case and whitespace; the first wins
#[must_use]
pub fn deduplicate(records: Vec<PaperRecord>) -> Vec<PaperRecord> {
    dedup_by_title(records, |r| r.title.as_str())
}

/// Whether a journal name looks like a Q1 venue
#[must_use]
pub fn is_q1_journal(journal_name: &str) -> bool {
    let journal = journal_name.to_lowercase();
    !journal.trim().is_empty() && Q1_INDICATORS.iter().any(|q| journal.contains(q))
}

/// Lower-case the query and drop stop words, keeping at least two words
#[must_use]
pub fn optimize_query(query: &str) -> String {
    let lowered = query.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let mut kept: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();

    if kept.len() < 2 && words.len() >= 2 {
        kept = words[..2].to_vec();
    }
    kept.join(" ")
}

/// Alphabetic words longer than three characters, at most `max_terms`
#[must_use]
pub fn extract_key_terms(query: &str, max_terms: usize) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3 && w.chars().all(char::is_alphabetic))
        .take(max_terms)
        .map(str::to_string)
        .collect()
}

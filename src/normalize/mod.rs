//! # Record normalization
//!
//! Turns arbitrarily-shaped provider records into [`PaperRecord`]s. Every
//! function here is total: any JSON value, even a bare number, produces a
//! well-formed record with documented defaults.

pub mod doi;
pub mod fields;
pub mod rules;
pub mod year;

use crate::client::{RawRecord, SourcedRecord};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Canonical paper metadata handed to downstream scoring
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaperRecord {
    /// 1 to 50 characters
    pub title: String,
    /// Surname-like fragment, 1 to 15 characters, `"Unknown"` when absent
    pub first_author: String,
    /// Four digits between 1900 and the current year
    pub year: String,
    /// May be empty
    pub journal_name: String,
    /// Bare `10.x/y` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

/// A normalized record plus what curation needs and `PaperRecord` drops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub record: PaperRecord,
    /// Title before the 50-char cap; empty when it had to be synthesized
    pub full_title: String,
    pub abstract_text: String,
    /// `None` when the year was defaulted
    pub published_year: Option<i32>,
    pub citation_count: Option<u64>,
    /// Adapter that produced the raw record
    pub source: String,
}

const UNAVAILABLE: &str = "unavailable";

fn mentions_unavailable(s: &str) -> bool {
    s.to_lowercase().contains(UNAVAILABLE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    current_year: i32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Normalizer anchored at today's year
    #[must_use]
    pub fn new() -> Self {
        Self::with_current_year(chrono::Utc::now().year())
    }

    #[must_use]
    pub const fn with_current_year(current_year: i32) -> Self {
        Self { current_year }
    }

    #[must_use]
    pub const fn current_year(&self) -> i32 {
        self.current_year
    }

    #[must_use]
    pub fn normalize(&self, raw: &RawRecord) -> PaperRecord {
        self.build(raw, None).record
    }

    #[must_use]
    pub fn candidate(&self, sourced: &SourcedRecord) -> Candidate {
        self.build(&sourced.raw, Some(&sourced.source))
    }

    fn build(&self, raw: &RawRecord, source: Option<&str>) -> Candidate {
        let full_title = fields::title(raw)
            .filter(|t| !mentions_unavailable(t))
            .unwrap_or_default();
        let title = if full_title.is_empty() {
            let synthesized = fields::synthesized_title(raw, source);
            if mentions_unavailable(&synthesized) {
                fields::synthesized_title(&serde_json::Value::Null, None)
            } else {
                synthesized
            }
        } else {
            fields::truncate_chars(&full_title, fields::TITLE_MAX_CHARS)
        };

        let mut first_author = fields::first_author(raw);
        if mentions_unavailable(&first_author) {
            first_author = fields::UNKNOWN_AUTHOR.to_string();
        }

        let mut journal_name = fields::journal_name(raw);
        if mentions_unavailable(&journal_name) {
            journal_name.clear();
        }

        let published_year = year::published_year(raw, self.current_year);
        let doi = doi::doi(raw).filter(|d| !mentions_unavailable(d));

        Candidate {
            record: PaperRecord {
                title,
                first_author,
                year: published_year.unwrap_or(self.current_year).to_string(),
                journal_name,
                doi,
            },
            full_title,
            abstract_text: fields::abstract_text(raw),
            published_year,
            citation_count: fields::citation_count(raw),
            source: source.unwrap_or_default().to_string(),
        }
    }
}

/// Normalize one record against the current year
#[must_use]
pub fn normalize(raw: &RawRecord) -> PaperRecord {
    Normalizer::new().normalize(raw)
}

//! # Gap Hunter
//!
//! Resilient retrieval of recent academic papers from several bibliographic
//! sources, normalization of their heterogeneous records into one canonical
//! shape, light-weight curation, and failover across generative-text
//! providers.
//!
//! ```no_run
//! # async fn demo() -> gap_hunter::Result<()> {
//! use gap_hunter::{Config, GapHunter};
//!
//! let config = Config::load(None)?;
//! let hunter = GapHunter::from_config(&config)?;
//! let report = hunter.hunt("soil carbon sequestration").await?;
//! for paper in &report.papers {
//!     println!("{} ({}) {}", paper.record.title, paper.record.year, paper.record.first_author);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod curator;
pub mod error;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod resilience;

pub use client::{FallbackOrchestrator, RawRecord, Retrieval, RetrievalMode, SourcedRecord};
pub use config::{Config, ConfigOverrides, Credentials};
pub use curator::{Curated, ResultCurator};
pub use error::{Error, ErrorCategory, Result};
pub use llm::{Generation, LlmDispatcher, LlmError, ProviderRegistry};
pub use normalize::{normalize, Candidate, Normalizer, PaperRecord};
pub use pipeline::{GapHunter, HuntOutcome, HuntReport, ReportedPaper};
pub use resilience::{Attempt, RetryEngine, RetryPolicy};

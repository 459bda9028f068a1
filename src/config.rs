//! # Configuration
//!
//! Layered configuration: built-in defaults, an optional TOML file, then
//! `GAP_HUNTER__SECTION__KEY` environment overrides. Credentials are read
//! once from their conventional environment variables into [`Credentials`]
//! and never written back to the process environment.

use crate::resilience::RetryPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "GAP_HUNTER";

/// Application configuration, constructed once at start-up
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub retry: RetrySettings,
    pub curator: CuratorSettings,
    pub llm: LlmSettings,
    pub logging: LoggingConfig,
    #[serde(skip)]
    pub credentials: Credentials,
}

/// Search endpoints and request shaping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub semantic_scholar_url: String,
    pub core_url: String,
    pub crossref_url: String,
    pub web_search_url: String,
    /// Custom Search engine id used when `GOOGLE_CSE_ID` is not set
    pub web_search_engine_id: String,
    pub enable_web_fallback: bool,
    /// Records requested from each primary source
    pub limit: u32,
    /// Records requested from the web-search fallback
    pub web_search_limit: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// In-flight cap for the concurrent collection path
    pub max_concurrent: usize,
    /// How long non-empty search results are reused; 0 disables the cache
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            semantic_scholar_url: "https://api.semanticscholar.org/graph/v1/paper/search"
                .to_string(),
            core_url: "https://api.core.ac.uk/v3/search/works".to_string(),
            crossref_url: "https://api.crossref.org/works".to_string(),
            web_search_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            web_search_engine_id: "017576662512468239146:omuauf_lfve".to_string(),
            enable_web_fallback: true,
            limit: 5,
            web_search_limit: 10,
            timeout_secs: 15,
            user_agent: "gap-hunter/0.3 (Academic Research Tool)".to_string(),
            max_concurrent: 5,
            cache_ttl_secs: 3600,
            cache_max_entries: 256,
        }
    }
}

impl SourcesConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Backoff policy for search requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub rate_limit_cooldown_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_jitter_ms: 1000,
            rate_limit_cooldown_secs: 5,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_jitter: Duration::from_millis(settings.max_jitter_ms),
            rate_limit_cooldown: Duration::from_secs(settings.rate_limit_cooldown_secs),
        }
    }
}

/// Filtering policy applied to retrieved candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorSettings {
    /// Papers older than this many years are dropped (unknown years are kept)
    pub recency_years: i32,
    /// How many unfiltered records to keep when recency removes everything
    pub recency_fallback: usize,
    /// Below this many relevant papers the recency set is used instead
    pub min_relevant: usize,
    pub max_candidates: usize,
    pub deduplicate: bool,
}

impl Default for CuratorSettings {
    fn default() -> Self {
        Self {
            recency_years: 10,
            recency_fallback: 10,
            min_relevant: 3,
            max_candidates: 5,
            deduplicate: false,
        }
    }
}

/// Generation defaults shared by every LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// TOML file holding the provider registry; built-in defaults when absent
    pub providers_file: Option<PathBuf>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub gemini_base_url: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            providers_file: dirs::config_dir().map(|dir| dir.join("gap-hunter").join("llm.toml")),
            temperature: 0.7,
            max_tokens: 4000,
            max_retries: 3,
            base_delay_ms: 1000,
            timeout_secs: 60,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl LlmSettings {
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_jitter: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// API credentials captured from the environment.
///
/// Field names map onto upper-case variables (`s2_api_key` → `S2_API_KEY`).
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    pub s2_api_key: Option<String>,
    pub core_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub contact_email: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Variables referenced by custom LLM providers
    #[serde(skip)]
    pub extra: HashMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut present: Vec<&str> = Self::KNOWN
            .iter()
            .copied()
            .filter(|name| self.get(name).is_some())
            .collect();
        present.extend(self.extra.keys().map(String::as_str));
        f.debug_struct("Credentials")
            .field("present", &present)
            .finish()
    }
}

impl Credentials {
    const KNOWN: [&'static str; 8] = [
        "S2_API_KEY",
        "CORE_API_KEY",
        "GOOGLE_API_KEY",
        "GOOGLE_CSE_ID",
        "CONTACT_EMAIL",
        "OPENAI_API_KEY",
        "ANTHROPIC_API_KEY",
        "GEMINI_API_KEY",
    ];

    /// Keys the search side expects; a missing one disables its adapter
    pub const SEARCH_KEYS: [&'static str; 4] =
        ["S2_API_KEY", "CORE_API_KEY", "GOOGLE_API_KEY", "CONTACT_EMAIL"];

    pub fn from_env() -> Result<Self> {
        Ok(envy::from_env::<Self>()?)
    }

    fn slot(&self, name: &str) -> Option<&Option<String>> {
        match name {
            "S2_API_KEY" => Some(&self.s2_api_key),
            "CORE_API_KEY" => Some(&self.core_api_key),
            "GOOGLE_API_KEY" => Some(&self.google_api_key),
            "GOOGLE_CSE_ID" => Some(&self.google_cse_id),
            "CONTACT_EMAIL" => Some(&self.contact_email),
            "OPENAI_API_KEY" => Some(&self.openai_api_key),
            "ANTHROPIC_API_KEY" => Some(&self.anthropic_api_key),
            "GEMINI_API_KEY" => Some(&self.gemini_api_key),
            _ => None,
        }
    }

    /// Look up a credential by its environment variable name; blank values count as absent
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match self.slot(name) {
            Some(slot) => slot.as_deref(),
            None => self.extra.get(name).map(String::as_str),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// Builder-style setter, mainly for tests and embedding applications
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match name {
            "S2_API_KEY" => self.s2_api_key = value,
            "CORE_API_KEY" => self.core_api_key = value,
            "GOOGLE_API_KEY" => self.google_api_key = value,
            "GOOGLE_CSE_ID" => self.google_cse_id = value,
            "CONTACT_EMAIL" => self.contact_email = value,
            "OPENAI_API_KEY" => self.openai_api_key = value,
            "ANTHROPIC_API_KEY" => self.anthropic_api_key = value,
            "GEMINI_API_KEY" => self.gemini_api_key = value,
            other => {
                self.extra
                    .insert(other.to_string(), value.unwrap_or_default());
            }
        }
        self
    }

    /// Capture additional variables named by the LLM provider registry
    pub fn capture_extra<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            if self.slot(name).is_none() {
                if let Ok(value) = std::env::var(name) {
                    self.extra.insert(name.to_string(), value);
                }
            }
        }
    }

    /// Search-side keys that are not configured
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        Self::SEARCH_KEYS
            .iter()
            .copied()
            .filter(|name| self.get(name).is_none())
            .collect()
    }
}

/// Command-line overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub limit: Option<u32>,
    pub providers_file: Option<PathBuf>,
    pub disable_web_fallback: bool,
}

impl Config {
    /// Load defaults, then the optional file, then `GAP_HUNTER__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.credentials = Credentials::from_env()?;

        let missing = config.credentials.missing();
        if !missing.is_empty() {
            warn!(
                "Missing API keys: {} (the matching sources will be skipped)",
                missing.join(", ")
            );
        }

        config.validate()?;
        Ok(config)
    }

    /// Replace the captured credentials, keeping everything else
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(level) = &overrides.log_level {
            self.logging.level.clone_from(level);
        }
        if let Some(limit) = overrides.limit {
            self.sources.limit = limit;
        }
        if let Some(path) = &overrides.providers_file {
            self.llm.providers_file = Some(path.clone());
        }
        if overrides.disable_web_fallback {
            self.sources.enable_web_fallback = false;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| Error::InvalidInput {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        for (field, url) in [
            ("sources.semantic_scholar_url", &self.sources.semantic_scholar_url),
            ("sources.core_url", &self.sources.core_url),
            ("sources.crossref_url", &self.sources.crossref_url),
            ("sources.web_search_url", &self.sources.web_search_url),
        ] {
            url::Url::parse(url).map_err(|e| invalid(field, &format!("invalid URL: {e}")))?;
        }

        if self.sources.timeout_secs == 0 {
            return Err(invalid("sources.timeout_secs", "must be greater than zero"));
        }
        if !(1..=1000).contains(&self.sources.limit) {
            return Err(invalid("sources.limit", "must be between 1 and 1000"));
        }
        if self.sources.max_concurrent == 0 {
            return Err(invalid("sources.max_concurrent", "must be greater than zero"));
        }
        if self.retry.max_retries == 0 {
            return Err(invalid("retry.max_retries", "must be at least 1"));
        }
        if self.curator.recency_years < 0 {
            return Err(invalid("curator.recency_years", "must not be negative"));
        }
        if self.curator.max_candidates == 0 {
            return Err(invalid("curator.max_candidates", "must be greater than zero"));
        }
        if self.llm.max_retries == 0 {
            return Err(invalid("llm.max_retries", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("llm.temperature", "must be between 0.0 and 2.0"));
        }
        Ok(())
    }
}

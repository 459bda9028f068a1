//! # Text generation
//!
//! A registry of generative-text backends (OpenAI, Anthropic, Google Gemini)
//! and a dispatcher that fails over from one to the next.
//!
//! ```no_run
//! # async fn demo(config: &gap_hunter::Config) -> Result<(), gap_hunter::llm::LlmError> {
//! use gap_hunter::llm::{LlmDispatcher, ProviderRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ProviderRegistry::from_config(config)?);
//! let dispatcher = LlmDispatcher::new(registry);
//! let generation = dispatcher
//!     .generate("Summarize recent work on soil carbon", "", Some("anthropic"))
//!     .await?;
//! println!("{} answered: {}", generation.provider, generation.text);
//! # Ok(())
//! # }
//! ```

pub mod anthropic;
pub mod config;
pub mod dispatcher;
pub mod gemini;
pub mod openai;
pub mod provider;
pub mod registry;

pub use config::{LlmProvidersConfig, ProviderConfig, ProviderEntry, ProviderKind};
pub use dispatcher::{Generation, LlmDispatcher};
pub use provider::{GenerationSettings, LlmProvider, ProviderState};
pub use registry::ProviderRegistry;

use crate::resilience::RateLimitAware;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Provider {0} not found in configuration")]
    UnknownProvider(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("No model specified for provider {0}")]
    NoModel(String),

    #[error("{provider} API key not found (set {env})")]
    MissingCredential { provider: String, env: String },

    #[error("{provider} rate limit exceeded: {message}")]
    RateLimited { provider: String, message: String },

    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("All LLM providers failed. Last error: {last_error}")]
    AllProvidersFailed { last_error: Box<LlmError> },

    #[error("No available LLM providers found")]
    NoProviderAvailable,

    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RateLimitAware for LlmError {
    fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Api { status: 429, .. } => true,
            // Bodies of non-429 answers that still signal throttling
            Self::Api { message, .. } => {
                let message = message.to_lowercase();
                message.contains("rate") || message.contains("quota")
            }
            _ => false,
        }
    }
}

impl From<toml::de::Error> for LlmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LlmError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<LlmError> for crate::Error {
    fn from(err: LlmError) -> Self {
        Self::Provider(err.to_string())
    }
}

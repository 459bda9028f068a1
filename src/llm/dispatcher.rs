use super::provider::ProviderState;
use super::registry::ProviderRegistry;
use super::LlmError;
use crate::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A successful generation and the backend that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub provider: String,
    pub model: String,
}

/// Tries providers in preference order until one answers
#[derive(Debug, Clone)]
pub struct LlmDispatcher {
    registry: Arc<ProviderRegistry>,
    policy: RetryPolicy,
}

impl LlmDispatcher {
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        let policy = registry.retry_policy();
        Self { registry, policy }
    }

    /// Override the per-provider retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// `preferred` first when it is declared and available, then every other
    /// available provider in declared order
    #[must_use]
    pub fn candidates(&self, preferred: Option<&str>) -> Vec<String> {
        let available = self.registry.available_providers();
        let mut order = Vec::with_capacity(available.len());
        if let Some(preferred) = preferred {
            if available.iter().any(|id| id == preferred) {
                order.push(preferred.to_string());
            } else {
                warn!("Preferred provider '{}' is not available", preferred);
            }
        }
        order.extend(available.into_iter().filter(|id| Some(id.as_str()) != preferred));
        order
    }

    #[instrument(skip(self, prompt, system_message))]
    pub async fn generate(
        &self,
        prompt: &str,
        system_message: &str,
        preferred: Option<&str>,
    ) -> Result<Generation, LlmError> {
        let mut last_error = None;

        for id in self.candidates(preferred) {
            info!("Trying provider: {}", id);
            let provider = match self.registry.create_provider(&id, None) {
                Ok(provider) => provider,
                Err(e) => {
                    warn!("Provider {} failed: {}", id, e);
                    self.registry.mark(&id, ProviderState::Unavailable);
                    last_error = Some(e);
                    continue;
                }
            };

            match provider
                .generate_with_fallback(prompt, system_message, &self.policy)
                .await
            {
                Ok(text) => {
                    self.registry.mark(&id, ProviderState::Available);
                    return Ok(Generation {
                        text,
                        model: provider.model().to_string(),
                        provider: id,
                    });
                }
                Err(e) => {
                    warn!("Provider {} failed: {}", id, e);
                    self.registry.mark(&id, ProviderState::Unavailable);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => LlmError::AllProvidersFailed {
                last_error: Box::new(e),
            },
            None => LlmError::NoProviderAvailable,
        })
    }
}

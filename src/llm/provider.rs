use super::LlmError;
use crate::config::LlmSettings;
use crate::resilience::{retry_propagating, RetryPolicy};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Sampling parameters shared by every backend
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&LlmSettings::default())
    }
}

impl From<&LlmSettings> for GenerationSettings {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

/// What the registry last learned about a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    #[default]
    Uninitialized,
    /// Declared and holding a credential, never called yet
    Configured,
    /// Last generation succeeded
    Available,
    /// Missing credential or last generation failed
    Unavailable,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Registry id, e.g. `openai`
    fn id(&self) -> &str;

    fn model(&self) -> &str;

    /// Whether a credential is present; no network call is made
    fn is_available(&self) -> bool;

    async fn generate(&self, prompt: &str, system_message: &str) -> Result<String, LlmError>;

    /// [`generate`](Self::generate) under a retry policy; the last error is returned
    async fn generate_with_fallback(
        &self,
        prompt: &str,
        system_message: &str,
        policy: &RetryPolicy,
    ) -> Result<String, LlmError> {
        retry_propagating(self.id(), policy, || self.generate(prompt, system_message)).await
    }
}

/// Send a JSON request and return the decoded body, mapping HTTP failures
/// onto [`LlmError`] variants
pub(crate) async fn post_json(
    request: RequestBuilder,
    provider: &str,
    body: &Value,
) -> Result<Value, LlmError> {
    let transport = |e: reqwest::Error| LlmError::Transport {
        provider: provider.to_string(),
        message: crate::error::redacted_message(e),
    };

    let response = request.json(body).send().await.map_err(transport)?;
    let status = response.status();
    debug!("{} answered {}", provider, status);

    if status.as_u16() == 429 {
        let message = response.text().await.unwrap_or_default();
        return Err(LlmError::RateLimited {
            provider: provider.to_string(),
            message,
        });
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            provider: provider.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    response.json::<Value>().await.map_err(transport)
}

/// Pull a non-empty string out of a response body
pub(crate) fn text_at(body: &Value, pointer: &str, provider: &str) -> Result<String, LlmError> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| LlmError::EmptyResponse {
            provider: provider.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        calls: AtomicU32,
        fail_first: u32,
        error: fn() -> LlmError,
    }

    #[async_trait]
    impl LlmProvider for Flaky {
        fn id(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "m"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err((self.error)())
            } else {
                Ok("done".to_string())
            }
        }
    }

    fn rate_limited() -> LlmError {
        LlmError::RateLimited {
            provider: "flaky".to_string(),
            message: "429".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_with_fallback_recovers() {
        let provider = Flaky {
            calls: AtomicU32::new(0),
            fail_first: 2,
            error: rate_limited,
        };
        let text = provider
            .generate_with_fallback("p", "", &RetryPolicy::immediate(3))
            .await
            .unwrap();
        assert_eq!(text, "done");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_generate_with_fallback_returns_last_error() {
        let provider = Flaky {
            calls: AtomicU32::new(0),
            fail_first: 10,
            error: || LlmError::EmptyResponse {
                provider: "flaky".to_string(),
            },
        };
        let err = provider
            .generate_with_fallback("p", "", &RetryPolicy::immediate(2))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_text_at() {
        let body = json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(text_at(&body, "/choices/0/message/content", "openai").unwrap(), "hi");
        assert!(matches!(
            text_at(&json!({"choices": []}), "/choices/0/message/content", "openai"),
            Err(LlmError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let settings = GenerationSettings::default();
        assert!((settings.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(settings.max_tokens, 4000);
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }
}

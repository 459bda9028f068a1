//! OpenAI-compatible chat completions client.
//!
//! Any backend that speaks `POST {base}/chat/completions` with bearer auth
//! can be driven through this client by giving it a custom base URL.

use super::provider::{post_json, text_at, GenerationSettings, LlmProvider};
use super::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    id: String,
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    settings: GenerationSettings,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        client: Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            id: id.into(),
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            settings,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn generate(&self, prompt: &str, system_message: &str) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if !system_message.is_empty() {
            messages.push(json!({"role": "system", "content": system_message}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        });

        debug!("Calling {} chat completions with model {}", self.id, self.model);
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.settings.timeout);

        let response = post_json(request, &self.id, &body).await?;
        text_at(&response, "/choices/0/message/content", &self.id)
    }
}

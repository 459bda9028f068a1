//! Anthropic Messages API client

use super::provider::{post_json, GenerationSettings, LlmProvider};
use super::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    id: String,
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    settings: GenerationSettings,
}

impl AnthropicClient {
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
impl LlmProvider for AnthropicClient {
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
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        if !system_message.is_empty() {
            body["system"] = Value::from(system_message);
        }

        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(self.settings.timeout);

        let response = post_json(request, &self.id, &body).await?;

        // The first text block carries the answer; tool-use blocks have no text
        response
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find_map(|block| block.get("text").and_then(Value::as_str))
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: self.id.clone(),
            })
    }
}

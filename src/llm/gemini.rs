use super::provider::{post_json, text_at, GenerationSettings, LlmProvider};
use super::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini `generateContent` client.
///
/// The API has no system role, so a system message is prepended to the prompt.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    id: String,
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    settings: GenerationSettings,
}

impl GeminiClient {
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

fn combined_prompt(prompt: &str, system_message: &str) -> String {
    if system_message.is_empty() {
        prompt.to_string()
    } else {
        format!("{system_message}\n\n{prompt}")
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
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
        let body = json!({
            "contents": [{"parts": [{"text": combined_prompt(prompt, system_message)}]}],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_tokens,
            },
        });

        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.settings.timeout);

        let response = post_json(request, &self.id, &body).await?;
        text_at(&response, "/candidates/0/content/parts/0/text", &self.id)
    }
}

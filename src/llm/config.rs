use super::LlmError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Wire protocol a provider speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    /// Infer the protocol from a well-known provider id
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "google" | "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }
}

/// One configured backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name
    pub name: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Second variable consulted when the first is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_api_key_env: Option<String>,
    /// Protocol override for ids that are not self-describing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    #[serde(flatten)]
    pub config: ProviderConfig,
}

impl ProviderEntry {
    #[must_use]
    pub fn kind(&self) -> Option<ProviderKind> {
        self.config.kind.or_else(|| ProviderKind::from_id(&self.id))
    }
}

/// The provider registry file: a default plus an ordered provider list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmProvidersConfig {
    pub default_provider: String,
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

impl Default for LlmProvidersConfig {
    fn default() -> Self {
        let entry = |id: &str, name: &str, models: &[&str], env: &str, alt: Option<&str>| {
            ProviderEntry {
                id: id.to_string(),
                config: ProviderConfig {
                    name: name.to_string(),
                    models: models.iter().map(|m| (*m).to_string()).collect(),
                    default_model: models.first().map(|m| (*m).to_string()),
                    api_key_env: env.to_string(),
                    alt_api_key_env: alt.map(str::to_string),
                    kind: None,
                    base_url: None,
                },
            }
        };

        Self {
            default_provider: "openai".to_string(),
            providers: vec![
                entry(
                    "openai",
                    "OpenAI",
                    &["gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo"],
                    "OPENAI_API_KEY",
                    None,
                ),
                entry(
                    "anthropic",
                    "Anthropic Claude",
                    &["claude-3-5-sonnet-20241022", "claude-3-haiku-20240307"],
                    "ANTHROPIC_API_KEY",
                    None,
                ),
                entry(
                    "google",
                    "Google Gemini",
                    &["gemini-pro", "gemini-pro-vision"],
                    "GEMINI_API_KEY",
                    Some("GOOGLE_API_KEY"),
                ),
            ],
        }
    }
}

impl LlmProvidersConfig {
    /// Read the registry file, falling back to the built-in providers when it does not exist
    pub fn load(path: &Path) -> Result<Self, LlmError> {
        if !path.exists() {
            debug!(
                "No provider file at {}, using built-in providers",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), LlmError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!("Saved LLM provider preferences to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), LlmError> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.providers {
            if entry.id.trim().is_empty() {
                return Err(LlmError::Config("provider id must not be empty".to_string()));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(LlmError::Config(format!("duplicate provider '{}'", entry.id)));
            }
            if entry.config.api_key_env.trim().is_empty() {
                return Err(LlmError::Config(format!(
                    "provider '{}' has no api_key_env",
                    entry.id
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|entry| entry.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ProviderEntry> {
        self.providers.iter_mut().find(|entry| entry.id == id)
    }

    /// Provider ids in declared order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|entry| entry.id.as_str())
    }

    /// Every credential variable the registry refers to
    pub fn credential_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().flat_map(|entry| {
            std::iter::once(entry.config.api_key_env.as_str())
                .chain(entry.config.alt_api_key_env.as_deref())
        })
    }
}

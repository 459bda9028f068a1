use super::anthropic::AnthropicClient;
use super::config::{LlmProvidersConfig, ProviderEntry, ProviderKind};
use super::gemini::GeminiClient;
use super::openai::OpenAiClient;
use super::provider::{GenerationSettings, LlmProvider, ProviderState};
use super::LlmError;
use crate::config::{Config, Credentials, LlmSettings};
use crate::resilience::RetryPolicy;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Declared LLM backends, their credentials and last known state.
///
/// The provider list is read once; [`save_preferences`](Self::save_preferences)
/// is the only writer and updates both memory and the backing file.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: RwLock<LlmProvidersConfig>,
    path: Option<PathBuf>,
    credentials: Credentials,
    settings: GenerationSettings,
    policy: RetryPolicy,
    openai_base_url: String,
    anthropic_base_url: String,
    gemini_base_url: String,
    client: Client,
    states: RwLock<HashMap<String, ProviderState>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(providers: LlmProvidersConfig, credentials: Credentials, settings: &LlmSettings) -> Self {
        Self {
            providers: RwLock::new(providers),
            path: None,
            credentials,
            settings: GenerationSettings::from(settings),
            policy: settings.retry_policy(),
            openai_base_url: settings.openai_base_url.clone(),
            anthropic_base_url: settings.anthropic_base_url.clone(),
            gemini_base_url: settings.gemini_base_url.clone(),
            client: Client::new(),
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Load the provider file named by `config.llm.providers_file`
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let providers = match &config.llm.providers_file {
            Some(path) => LlmProvidersConfig::load(path)?,
            None => LlmProvidersConfig::default(),
        };

        let mut credentials = config.credentials.clone();
        credentials.capture_extra(providers.credential_names());

        let client = Client::builder()
            .user_agent(config.sources.user_agent.as_str())
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;

        let mut registry = Self::new(providers, credentials, &config.llm).with_client(client);
        registry.path.clone_from(&config.llm.providers_file);
        Ok(registry)
    }

    /// File that [`save_preferences`](Self::save_preferences) writes to
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy.clone()
    }

    fn snapshot(&self) -> LlmProvidersConfig {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn entry(&self, id: &str) -> Option<ProviderEntry> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Every declared provider id, in declared order
    #[must_use]
    pub fn provider_ids(&self) -> Vec<String> {
        self.snapshot().ids().map(str::to_string).collect()
    }

    /// Declared providers whose credential is present, in declared order
    #[must_use]
    pub fn available_providers(&self) -> Vec<String> {
        self.provider_ids()
            .into_iter()
            .filter(|id| self.check_provider_availability(id))
            .collect()
    }

    #[must_use]
    pub fn provider_models(&self, id: &str) -> Vec<String> {
        self.entry(id).map(|e| e.config.models).unwrap_or_default()
    }

    #[must_use]
    pub fn provider_info(&self, id: &str) -> Option<ProviderEntry> {
        self.entry(id)
    }

    fn credential(&self, entry: &ProviderEntry) -> Option<String> {
        self.credentials
            .get(&entry.config.api_key_env)
            .or_else(|| {
                entry
                    .config
                    .alt_api_key_env
                    .as_deref()
                    .and_then(|alt| self.credentials.get(alt))
            })
            .map(str::to_string)
    }

    /// Build a client for `id`, using `model` or the provider's default model
    pub fn create_provider(
        &self,
        id: &str,
        model: Option<&str>,
    ) -> Result<Box<dyn LlmProvider>, LlmError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| LlmError::UnknownProvider(id.to_string()))?;

        let model = model
            .map(str::to_string)
            .or_else(|| entry.config.default_model.clone())
            .ok_or_else(|| LlmError::NoModel(id.to_string()))?;

        let kind = entry
            .kind()
            .ok_or_else(|| LlmError::UnsupportedProvider(id.to_string()))?;

        let Some(api_key) = self.credential(&entry) else {
            self.mark(id, ProviderState::Unavailable);
            return Err(LlmError::MissingCredential {
                provider: entry.config.name.clone(),
                env: entry.config.api_key_env.clone(),
            });
        };

        let base_url = entry.config.base_url.clone().unwrap_or_else(|| match kind {
            ProviderKind::OpenAi => self.openai_base_url.clone(),
            ProviderKind::Anthropic => self.anthropic_base_url.clone(),
            ProviderKind::Gemini => self.gemini_base_url.clone(),
        });

        debug!("Creating {:?} provider '{}' with model {}", kind, id, model);
        let client = self.client.clone();
        let settings = self.settings.clone();
        let provider: Box<dyn LlmProvider> = match kind {
            ProviderKind::OpenAi => Box::new(
                OpenAiClient::new(id, client, api_key, model, settings).with_base_url(base_url),
            ),
            ProviderKind::Anthropic => Box::new(
                AnthropicClient::new(id, client, api_key, model, settings).with_base_url(base_url),
            ),
            ProviderKind::Gemini => Box::new(
                GeminiClient::new(id, client, api_key, model, settings).with_base_url(base_url),
            ),
        };

        if self.provider_state(id) == ProviderState::Uninitialized {
            self.mark(id, ProviderState::Configured);
        }
        Ok(provider)
    }

    /// Whether `id` is declared and a client for it can be built
    #[must_use]
    pub fn check_provider_availability(&self, id: &str) -> bool {
        self.create_provider(id, None)
            .map(|provider| provider.is_available())
            .unwrap_or(false)
    }

    /// The default provider, else the first declared provider that can be built
    #[must_use]
    pub fn current_provider(&self) -> Option<Box<dyn LlmProvider>> {
        let snapshot = self.snapshot();
        let found = std::iter::once(snapshot.default_provider.as_str())
            .chain(snapshot.ids())
            .find_map(|id| match self.create_provider(id, None) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    debug!("Provider '{}' unusable: {}", id, e);
                    None
                }
            });
        found
    }

    #[must_use]
    pub fn provider_state(&self, id: &str) -> ProviderState {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn mark(&self, id: &str, state: ProviderState) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), state);
    }

    /// Make `id`/`model` the default and persist it when a file is configured
    pub fn save_preferences(&self, id: &str, model: &str) -> Result<(), LlmError> {
        let updated = {
            let mut providers = self
                .providers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let entry = providers
                .get_mut(id)
                .ok_or_else(|| LlmError::UnknownProvider(id.to_string()))?;
            entry.config.default_model = Some(model.to_string());
            providers.default_provider = id.to_string();
            providers.clone()
        };

        match &self.path {
            Some(path) => updated.save(path)?,
            None => warn!("No provider file configured, preferences kept in memory only"),
        }
        info!("Default LLM provider set to {} ({})", id, model);
        Ok(())
    }

    /// `(default_provider, default_model)`; the model is empty when unset
    #[must_use]
    pub fn load_preferences(&self) -> (String, String) {
        let snapshot = self.snapshot();
        let model = snapshot
            .get(&snapshot.default_provider)
            .and_then(|entry| entry.config.default_model.clone())
            .unwrap_or_default();
        (snapshot.default_provider, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(credentials: Credentials) -> ProviderRegistry {
        ProviderRegistry::new(
            LlmProvidersConfig::default(),
            credentials,
            &LlmSettings::default(),
        )
    }

    #[test]
    fn test_available_providers_follow_credentials() {
        let registry = registry(
            Credentials::default()
                .with("ANTHROPIC_API_KEY", "ak")
                .with("GOOGLE_API_KEY", "gk"),
        );
        assert_eq!(registry.provider_ids(), vec!["openai", "anthropic", "google"]);
        assert_eq!(registry.available_providers(), vec!["anthropic", "google"]);
        assert_eq!(registry.provider_state("openai"), ProviderState::Unavailable);
        assert_eq!(registry.provider_state("anthropic"), ProviderState::Configured);
    }

    #[test]
    fn test_create_provider_errors() {
        let registry = registry(Credentials::default().with("OPENAI_API_KEY", "sk"));

        assert!(matches!(
            registry.create_provider("mistral", None),
            Err(LlmError::UnknownProvider(id)) if id == "mistral"
        ));
        assert!(matches!(
            registry.create_provider("anthropic", None),
            Err(LlmError::MissingCredential { env, .. }) if env == "ANTHROPIC_API_KEY"
        ));

        let provider = registry.create_provider("openai", Some("gpt-4o-mini")).unwrap();
        assert_eq!(provider.id(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert!(provider.is_available());
    }

    #[test]
    fn test_no_model() {
        let mut providers = LlmProvidersConfig::default();
        providers.providers[0].config.default_model = None;
        let registry = ProviderRegistry::new(
            providers,
            Credentials::default().with("OPENAI_API_KEY", "sk"),
            &LlmSettings::default(),
        );
        assert!(matches!(
            registry.create_provider("openai", None),
            Err(LlmError::NoModel(_))
        ));
    }

    #[test]
    fn test_unsupported_kind() {
        let mut providers = LlmProvidersConfig::default();
        providers.providers[0].id = "cohere".to_string();
        let registry = ProviderRegistry::new(
            providers,
            Credentials::default().with("OPENAI_API_KEY", "sk"),
            &LlmSettings::default(),
        );
        assert!(matches!(
            registry.create_provider("cohere", None),
            Err(LlmError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_current_provider_falls_through() {
        let registry = registry(Credentials::default().with("GEMINI_API_KEY", "g"));
        let provider = registry.current_provider().unwrap();
        assert_eq!(provider.id(), "google");
        assert_eq!(provider.model(), "gemini-pro");

        assert!(registry_without_keys().current_provider().is_none());
    }

    fn registry_without_keys() -> ProviderRegistry {
        registry(Credentials::default())
    }

    #[test]
    fn test_provider_models_and_info() {
        let registry = registry_without_keys();
        assert_eq!(
            registry.provider_models("anthropic"),
            vec!["claude-3-5-sonnet-20241022", "claude-3-haiku-20240307"]
        );
        assert!(registry.provider_models("nope").is_empty());
        assert_eq!(registry.provider_info("google").unwrap().config.name, "Google Gemini");
    }

    #[test]
    fn test_save_and_load_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm.toml");
        let registry = registry_without_keys().with_path(&path);

        assert_eq!(
            registry.load_preferences(),
            ("openai".to_string(), "gpt-4o".to_string())
        );

        registry
            .save_preferences("anthropic", "claude-3-haiku-20240307")
            .unwrap();
        assert_eq!(
            registry.load_preferences(),
            ("anthropic".to_string(), "claude-3-haiku-20240307".to_string())
        );

        let persisted = LlmProvidersConfig::load(&path).unwrap();
        assert_eq!(persisted.default_provider, "anthropic");

        assert!(matches!(
            registry.save_preferences("mistral", "large"),
            Err(LlmError::UnknownProvider(_))
        ));
    }
}

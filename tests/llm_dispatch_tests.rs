//! Provider failover against mock LLM backends

use gap_hunter::config::{Credentials, LlmSettings};
use gap_hunter::llm::{
    LlmDispatcher, LlmError, LlmProvidersConfig, ProviderConfig, ProviderEntry, ProviderKind,
    ProviderRegistry, ProviderState,
};
use gap_hunter::RetryPolicy;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entry(id: &str, kind: ProviderKind, env: &str, base_url: &str) -> ProviderEntry {
    ProviderEntry {
        id: id.to_string(),
        config: ProviderConfig {
            name: id.to_string(),
            models: vec![format!("{id}-model")],
            default_model: Some(format!("{id}-model")),
            api_key_env: env.to_string(),
            alt_api_key_env: None,
            kind: Some(kind),
            base_url: Some(base_url.to_string()),
        },
    }
}

/// openai, anthropic and google, each on its own mock server
fn registry(
    openai: &MockServer,
    anthropic: &MockServer,
    gemini: &MockServer,
    credentials: Credentials,
) -> ProviderRegistry {
    let providers = LlmProvidersConfig {
        default_provider: "openai".to_string(),
        providers: vec![
            entry("openai", ProviderKind::OpenAi, "OPENAI_API_KEY", &openai.uri()),
            entry("anthropic", ProviderKind::Anthropic, "ANTHROPIC_API_KEY", &anthropic.uri()),
            entry("google", ProviderKind::Gemini, "GEMINI_API_KEY", &gemini.uri()),
        ],
    };
    ProviderRegistry::new(providers, credentials, &LlmSettings::default())
}

fn all_keys() -> Credentials {
    Credentials::default()
        .with("OPENAI_API_KEY", "sk")
        .with("ANTHROPIC_API_KEY", "ak")
        .with("GEMINI_API_KEY", "gk")
}

fn dispatcher(registry: ProviderRegistry) -> LlmDispatcher {
    LlmDispatcher::new(Arc::new(registry)).with_policy(RetryPolicy::immediate(2))
}

async fn anthropic_answers(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"content": [{"type": "text", "text": text}]})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_preferred_provider_answers_first() {
    let (openai, anthropic, gemini) =
        (MockServer::start().await, MockServer::start().await, MockServer::start().await);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&openai)
        .await;
    anthropic_answers(&anthropic, "from claude").await;

    let dispatcher = dispatcher(registry(&openai, &anthropic, &gemini, all_keys()));
    let generation = dispatcher
        .generate("summarize", "be brief", Some("anthropic"))
        .await
        .unwrap();

    assert_eq!(generation.provider, "anthropic");
    assert_eq!(generation.model, "anthropic-model");
    assert_eq!(generation.text, "from claude");
    assert_eq!(
        dispatcher.registry().provider_state("anthropic"),
        ProviderState::Available
    );
}

#[tokio::test]
async fn test_failing_provider_hands_over_to_the_next() {
    let (openai, anthropic, gemini) =
        (MockServer::start().await, MockServer::start().await, MockServer::start().await);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(2)
        .mount(&openai)
        .await;
    anthropic_answers(&anthropic, "fallback answer").await;

    let dispatcher = dispatcher(registry(&openai, &anthropic, &gemini, all_keys()));
    let generation = dispatcher.generate("hello", "", None).await.unwrap();

    assert_eq!(generation.provider, "anthropic");
    assert_eq!(generation.text, "fallback answer");
    assert_eq!(
        dispatcher.registry().provider_state("openai"),
        ProviderState::Unavailable
    );
}

#[tokio::test]
async fn test_rate_limited_provider_is_retried_before_failover() {
    let (openai, anthropic, gemini) =
        (MockServer::start().await, MockServer::start().await, MockServer::start().await);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit reached"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "second try"}}]})),
        )
        .expect(1)
        .mount(&openai)
        .await;

    let dispatcher = dispatcher(registry(&openai, &anthropic, &gemini, all_keys()));
    let generation = dispatcher.generate("hello", "", Some("openai")).await.unwrap();
    assert_eq!(generation.provider, "openai");
    assert_eq!(generation.text, "second try");
}

#[tokio::test]
async fn test_providers_without_keys_are_never_called() {
    let (openai, anthropic, gemini) =
        (MockServer::start().await, MockServer::start().await, MockServer::start().await);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/google-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "gemini here"}]}}]
        })))
        .expect(1)
        .mount(&gemini)
        .await;

    let credentials = Credentials::default().with("GEMINI_API_KEY", "gk");
    let dispatcher = dispatcher(registry(&openai, &anthropic, &gemini, credentials));

    assert_eq!(dispatcher.candidates(Some("openai")), vec!["google"]);
    let generation = dispatcher.generate("hi", "", Some("openai")).await.unwrap();
    assert_eq!(generation.provider, "google");
}

#[tokio::test]
async fn test_every_provider_failing_reports_the_last_error() {
    let (openai, anthropic, gemini) =
        (MockServer::start().await, MockServer::start().await, MockServer::start().await);
    for server in [&openai, &anthropic, &gemini] {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(server)
            .await;
    }

    let dispatcher = dispatcher(registry(&openai, &anthropic, &gemini, all_keys()));
    let err = dispatcher.generate("hello", "", None).await.unwrap_err();

    match &err {
        LlmError::AllProvidersFailed { last_error } => {
            assert!(matches!(
                last_error.as_ref(),
                LlmError::Api { provider, status: 503, .. } if provider == "google"
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("All LLM providers failed. Last error:"));
}

#[tokio::test]
async fn test_no_credentials_means_no_provider() {
    let (openai, anthropic, gemini) =
        (MockServer::start().await, MockServer::start().await, MockServer::start().await);
    let dispatcher = dispatcher(registry(&openai, &anthropic, &gemini, Credentials::default()));

    let err = dispatcher.generate("hello", "", Some("openai")).await.unwrap_err();
    assert!(matches!(err, LlmError::NoProviderAvailable));
}

#[tokio::test]
async fn test_saved_preferences_survive_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("llm.toml");

    let registry = ProviderRegistry::new(
        LlmProvidersConfig::default(),
        Credentials::default(),
        &LlmSettings::default(),
    )
    .with_path(&path);
    registry.save_preferences("google", "gemini-pro-vision").unwrap();

    let reloaded = ProviderRegistry::new(
        LlmProvidersConfig::load(&path).unwrap(),
        Credentials::default(),
        &LlmSettings::default(),
    );
    assert_eq!(
        reloaded.load_preferences(),
        ("google".to_string(), "gemini-pro-vision".to_string())
    );
    assert_eq!(
        reloaded.provider_models("google"),
        vec!["gemini-pro", "gemini-pro-vision"]
    );
}

#[tokio::test]
async fn test_unavailable_preferred_provider_hands_over_in_declared_order() {
    let (openai, anthropic, gemini) =
        (MockServer::start().await, MockServer::start().await, MockServer::start().await);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(2)
        .mount(&anthropic)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "third in line"}]}}]
        })))
        .expect(1)
        .mount(&gemini)
        .await;

    let credentials = Credentials::default()
        .with("ANTHROPIC_API_KEY", "ak")
        .with("GEMINI_API_KEY", "gk");
    let dispatcher = dispatcher(registry(&openai, &anthropic, &gemini, credentials));

    assert_eq!(dispatcher.candidates(Some("openai")), vec!["anthropic", "google"]);
    let generation = dispatcher.generate("hello", "", Some("openai")).await.unwrap();
    assert_eq!(generation.provider, "google");
    assert_eq!(generation.text, "third in line");
    assert_eq!(
        dispatcher.registry().provider_state("anthropic"),
        ProviderState::Unavailable
    );
}

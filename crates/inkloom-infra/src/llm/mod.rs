//! LLM provider implementations.
//!
//! Contains concrete implementations of the [`LlmProvider`] trait defined
//! in `inkloom-core`: the Anthropic Messages API adapter and the unified
//! OpenAI-compatible adapter.
//!
//! Also provides [`HttpProviderFactory`], the production implementation of
//! core's `ProviderFactory` (classification -> concrete adapter), and a
//! connection test function ([`test_provider_connection`]) for verifying
//! provider connectivity when a model configuration is saved.
//!
//! [`LlmProvider`]: inkloom_core::llm::provider::LlmProvider

pub mod anthropic;
pub mod openai_compat;

use secrecy::SecretString;

use inkloom_core::llm::box_provider::BoxLlmProvider;
use inkloom_core::llm::kind::{ProviderKind, classify_provider};
use inkloom_core::llm::provider::ProviderFactory;
use inkloom_types::llm::{InvocationRequest, LlmError};
use inkloom_types::model::ModelConfig;

use self::anthropic::AnthropicProvider;
use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Production provider factory backed by real HTTP adapters.
///
/// Classification happens once per `create` call via `classify_provider`;
/// each adapter owns its HTTP client, so a fresh adapter per node dispatch
/// is cheap (reqwest clients share their connection pool when cloned, not
/// across constructions -- acceptable for per-run dispatch rates).
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProviderFactory;

impl HttpProviderFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(&self, config: &ModelConfig) -> Result<BoxLlmProvider, LlmError> {
        create_provider(config)
    }
}

/// Create a [`BoxLlmProvider`] from a [`ModelConfig`].
///
/// An empty API key fails here, locally, before any adapter is constructed
/// or any socket is opened.
pub fn create_provider(config: &ModelConfig) -> Result<BoxLlmProvider, LlmError> {
    if config.api_key.is_empty() {
        return Err(LlmError::MissingApiKey {
            model: display_name(config),
        });
    }

    let kind = classify_provider(config);
    let provider = match kind {
        ProviderKind::AnthropicCompatible => {
            let secret = SecretString::from(config.api_key.clone());
            let mut provider = AnthropicProvider::new(secret, config.model_id.clone());
            if let Some(base_url) = configured_url(config) {
                provider = provider.with_base_url(base_url.to_string());
            }
            BoxLlmProvider::new(provider)
        }
        ProviderKind::OpenAiCompatible => {
            let provider = match configured_url(config) {
                Some(base_url) => OpenAiCompatibleProvider::new(OpenAiCompatConfig {
                    provider_name: display_name(config),
                    base_url: base_url.to_string(),
                    api_key: config.api_key.clone(),
                    model: config.model_id.clone(),
                }),
                None => infer_compat_provider(config),
            };
            BoxLlmProvider::new(provider)
        }
        ProviderKind::Custom => {
            // An endpoint nothing recognized; speak OpenAI wire to it.
            let base_url = configured_url(config).unwrap_or("https://api.openai.com/v1");
            BoxLlmProvider::new(OpenAiCompatibleProvider::custom(OpenAiCompatConfig {
                provider_name: display_name(config),
                base_url: base_url.to_string(),
                api_key: config.api_key.clone(),
                model: config.model_id.clone(),
            }))
        }
    };
    Ok(provider)
}

/// Pick endpoint defaults for a URL-less OpenAI-compatible configuration.
///
/// Mirrors the name/model heuristics of `classify_provider`: a config that
/// classified as OpenAI-compatible without a URL did so because of one of
/// these prefixes.
fn infer_compat_provider(config: &ModelConfig) -> OpenAiCompatibleProvider {
    let model = config.model_id.to_ascii_lowercase();
    let name = config.name.to_ascii_lowercase();

    if model.starts_with("gemini") || name.contains("gemini") {
        OpenAiCompatibleProvider::gemini(&config.api_key, &config.model_id)
    } else if model.starts_with("mistral") || name.contains("mistral") {
        OpenAiCompatibleProvider::mistral(&config.api_key, &config.model_id)
    } else if model.starts_with("glm") || name.contains("glm") {
        OpenAiCompatibleProvider::glm(&config.api_key, &config.model_id)
    } else {
        // gpt/o1/o3/deepseek and anything else OpenAI-flavored
        OpenAiCompatibleProvider::openai(&config.api_key, &config.model_id)
    }
}

fn configured_url(config: &ModelConfig) -> Option<&str> {
    config.api_url.as_deref().filter(|url| !url.is_empty())
}

fn display_name(config: &ModelConfig) -> String {
    if config.name.is_empty() {
        config.model_id.clone()
    } else {
        config.name.clone()
    }
}

/// Test provider connectivity by sending a minimal invocation.
///
/// Used when a model configuration is saved to verify the API key and
/// endpoint are working. Sends a tiny "Hello" prompt; any response counts
/// as success.
///
/// # Errors
///
/// Returns the LLM error if the provider fails to respond.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = InvocationRequest::text("", "Hello");
    provider.invoke(&request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, model_id: &str, api_url: Option<&str>) -> ModelConfig {
        ModelConfig {
            id: "m1".to_string(),
            name: name.to_string(),
            model_id: model_id.to_string(),
            api_key: "test-key-not-real".to_string(),
            api_url: api_url.map(str::to_string),
            is_default: true,
        }
    }

    #[test]
    fn test_create_provider_anthropic() {
        let provider = create_provider(&config("Claude", "claude-sonnet-4-20250514", None)).unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.kind(), ProviderKind::AnthropicCompatible);
    }

    #[test]
    fn test_create_provider_anthropic_with_proxy_url() {
        let provider = create_provider(&config(
            "Claude via proxy",
            "claude-sonnet-4-20250514",
            Some("https://proxy.api.anthropic.com"),
        ))
        .unwrap();
        assert_eq!(provider.kind(), ProviderKind::AnthropicCompatible);
    }

    #[test]
    fn test_create_provider_openai_by_model() {
        let provider = create_provider(&config("", "gpt-4o", None)).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.kind(), ProviderKind::OpenAiCompatible);
    }

    #[test]
    fn test_create_provider_gemini_by_name() {
        let provider = create_provider(&config("Gemini main", "custom-tune-2", None)).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn test_create_provider_mistral_by_model() {
        let provider = create_provider(&config("", "mistral-large-latest", None)).unwrap();
        assert_eq!(provider.name(), "mistral");
    }

    #[test]
    fn test_create_provider_glm_by_model() {
        let provider = create_provider(&config("", "glm-4.7", None)).unwrap();
        assert_eq!(provider.name(), "glm");
    }

    #[test]
    fn test_create_provider_known_url_keeps_display_name() {
        let provider = create_provider(&config(
            "Gemini",
            "gemini-2.5-pro",
            Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        ))
        .unwrap();
        assert_eq!(provider.name(), "Gemini");
        assert_eq!(provider.kind(), ProviderKind::OpenAiCompatible);
    }

    #[test]
    fn test_create_provider_custom_url() {
        let provider =
            create_provider(&config("House model", "ink-70b", Some("http://localhost:11434/v1")))
                .unwrap();
        assert_eq!(provider.name(), "House model");
        assert_eq!(provider.kind(), ProviderKind::Custom);
    }

    #[test]
    fn test_missing_api_key_fails_locally() {
        let mut bad = config("Claude", "claude-sonnet-4-20250514", None);
        bad.api_key = String::new();
        let err = create_provider(&bad).unwrap_err();
        match err {
            LlmError::MissingApiKey { model } => assert_eq!(model, "Claude"),
            other => panic!("expected MissingApiKey, got {other}"),
        }
    }

    #[test]
    fn test_missing_api_key_without_name_reports_model_id() {
        let mut bad = config("", "gpt-4o", None);
        bad.api_key = String::new();
        let err = create_provider(&bad).unwrap_err();
        assert!(err.to_string().contains("gpt-4o"));
    }

    #[test]
    fn test_factory_trait_delegates() {
        let factory = HttpProviderFactory::new();
        let provider = factory.create(&config("Claude", "claude-opus-4", None)).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}

//! Provider family classification.
//!
//! The mapping from a [`ModelConfig`] to its backend family is a single
//! pure function over the configured URL (substring match against known
//! provider domains) or, absent a URL, over name/model heuristics. The
//! result is a closed enum so downstream dispatch is exhaustive.

use inkloom_types::model::ModelConfig;

/// The backend family an adapter speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Anthropic Messages API wire format.
    AnthropicCompatible,
    /// OpenAI chat-completions wire format (also spoken by Gemini, Mistral,
    /// and most self-hosted gateways).
    OpenAiCompatible,
    /// An explicit URL that matched no known domain; spoken to with the
    /// OpenAI-compatible wire format.
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnthropicCompatible => "anthropic-compatible",
            Self::OpenAiCompatible => "openai-compatible",
            Self::Custom => "custom",
        }
    }

    /// Whether this family enforces an organization-wide ceiling of exactly
    /// one in-flight request, served by the shell's binary gate.
    pub fn requires_exclusive_dispatch(&self) -> bool {
        matches!(self, Self::AnthropicCompatible)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a model configuration into its provider family.
///
/// Pure: resolved once when the configuration is loaded, never re-derived
/// per call. A configured URL wins over any name heuristic.
pub fn classify_provider(config: &ModelConfig) -> ProviderKind {
    if let Some(url) = config.api_url.as_deref().filter(|u| !u.is_empty()) {
        let url = url.to_ascii_lowercase();
        if url.contains("anthropic.com") {
            return ProviderKind::AnthropicCompatible;
        }
        if url.contains("openai.com")
            || url.contains("googleapis.com")
            || url.contains("mistral.ai")
        {
            return ProviderKind::OpenAiCompatible;
        }
        return ProviderKind::Custom;
    }

    let model = config.model_id.to_ascii_lowercase();
    let name = config.name.to_ascii_lowercase();

    if model.starts_with("claude") || name.contains("anthropic") || name.contains("claude") {
        return ProviderKind::AnthropicCompatible;
    }

    let openai_model = ["gpt", "o1", "o3", "gemini", "mistral", "glm", "deepseek"]
        .iter()
        .any(|prefix| model.starts_with(prefix));
    let openai_name = ["openai", "gemini", "mistral", "glm"]
        .iter()
        .any(|alias| name.contains(alias));
    if openai_model || openai_name {
        return ProviderKind::OpenAiCompatible;
    }

    ProviderKind::Custom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, model_id: &str, api_url: Option<&str>) -> ModelConfig {
        ModelConfig {
            id: "m1".to_string(),
            name: name.to_string(),
            model_id: model_id.to_string(),
            api_key: "key".to_string(),
            api_url: api_url.map(str::to_string),
            is_default: false,
        }
    }

    #[test]
    fn url_domain_wins_over_name() {
        let cases = [
            (
                config("Claude", "claude-sonnet-4", Some("https://api.anthropic.com")),
                ProviderKind::AnthropicCompatible,
            ),
            (
                // URL beats the "claude" name heuristic.
                config("claude-ish", "my-model", Some("https://api.openai.com/v1")),
                ProviderKind::OpenAiCompatible,
            ),
            (
                config(
                    "Gemini",
                    "gemini-2.5-pro",
                    Some("https://generativelanguage.googleapis.com/v1beta/openai"),
                ),
                ProviderKind::OpenAiCompatible,
            ),
            (
                config("Mistral", "mistral-large", Some("https://api.mistral.ai/v1")),
                ProviderKind::OpenAiCompatible,
            ),
            (
                config("Local", "llama3", Some("http://localhost:11434/v1")),
                ProviderKind::Custom,
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(classify_provider(&config), expected, "{}", config.name);
        }
    }

    #[test]
    fn name_and_model_heuristics_without_url() {
        let cases = [
            (config("X", "claude-opus-4", None), ProviderKind::AnthropicCompatible),
            (config("Anthropic main", "something", None), ProviderKind::AnthropicCompatible),
            (config("X", "gpt-4o", None), ProviderKind::OpenAiCompatible),
            (config("X", "o1-mini", None), ProviderKind::OpenAiCompatible),
            (config("X", "gemini-2.0-flash", None), ProviderKind::OpenAiCompatible),
            (config("X", "glm-4-plus", None), ProviderKind::OpenAiCompatible),
            (config("OpenAI backup", "fine-tune-7", None), ProviderKind::OpenAiCompatible),
            (config("House model", "ink-70b", None), ProviderKind::Custom),
        ];
        for (config, expected) in cases {
            assert_eq!(
                classify_provider(&config),
                expected,
                "{} / {}",
                config.name,
                config.model_id
            );
        }
    }

    #[test]
    fn empty_url_falls_back_to_heuristics() {
        let config = config("X", "claude-haiku", Some(""));
        assert_eq!(classify_provider(&config), ProviderKind::AnthropicCompatible);
    }

    #[test]
    fn only_anthropic_family_is_gated() {
        assert!(ProviderKind::AnthropicCompatible.requires_exclusive_dispatch());
        assert!(!ProviderKind::OpenAiCompatible.requires_exclusive_dispatch());
        assert!(!ProviderKind::Custom.requires_exclusive_dispatch());
    }
}

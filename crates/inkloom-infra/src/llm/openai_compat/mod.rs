//! OpenAI-compatible LLM provider implementation.
//!
//! A single [`OpenAiCompatibleProvider`] serves OpenAI, Google Gemini,
//! Mistral, GLM, and any self-hosted gateway that speaks the chat
//! completions protocol -- one codebase via configurable base URLs and
//! factory functions.
//!
//! Uses [`async_openai`] for type-safe request/response handling and
//! built-in SSE streaming.

pub mod config;
pub mod streaming;

use std::pin::Pin;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use futures_util::{Stream, StreamExt};
use tracing::debug;

use inkloom_core::llm::kind::ProviderKind;
use inkloom_core::llm::provider::LlmProvider;
use inkloom_core::schema::schema_instruction;
use inkloom_types::llm::{InvocationRequest, InvocationResponse, LlmError, StreamEvent};

use self::config::OpenAiCompatConfig;
use self::streaming::map_openai_stream;

/// Output budget sent with every request; the invocation contract has no
/// token accounting, so the adapter owns this ceiling.
const DEFAULT_MAX_TOKENS: u32 = 8_192;

/// Unified provider for any OpenAI-compatible API.
///
/// Supports: OpenAI, Google Gemini, Mistral, GLM, and custom endpoints.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`. Same pattern as
/// [`super::anthropic::AnthropicProvider`].
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
    kind: ProviderKind,
}

impl OpenAiCompatibleProvider {
    /// Create a new OpenAI-compatible provider from a configuration.
    pub fn new(config: OpenAiCompatConfig) -> Self {
        Self::with_kind(config, ProviderKind::OpenAiCompatible)
    }

    /// Create a provider for an endpoint that matched no known domain.
    ///
    /// Spoken to with the same wire format; reported as
    /// [`ProviderKind::Custom`].
    pub fn custom(config: OpenAiCompatConfig) -> Self {
        Self::with_kind(config, ProviderKind::Custom)
    }

    fn with_kind(config: OpenAiCompatConfig, kind: ProviderKind) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
            kind,
        }
    }

    /// Create an OpenAI provider.
    ///
    /// Uses `https://api.openai.com/v1` as the base URL.
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self::new(config::openai_defaults(api_key, model))
    }

    /// Create a Google Gemini provider (OpenAI-compatible beta endpoint).
    ///
    /// Uses `https://generativelanguage.googleapis.com/v1beta/openai` as the base URL.
    pub fn gemini(api_key: &str, model: &str) -> Self {
        Self::new(config::gemini_defaults(api_key, model))
    }

    /// Create a Mistral AI provider.
    ///
    /// Uses `https://api.mistral.ai/v1` as the base URL.
    pub fn mistral(api_key: &str, model: &str) -> Self {
        Self::new(config::mistral_defaults(api_key, model))
    }

    /// Create a GLM (z.ai) provider.
    ///
    /// Uses `https://api.z.ai/api/paas/v4` as the base URL.
    pub fn glm(api_key: &str, model: &str) -> Self {
        Self::new(config::glm_defaults(api_key, model))
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic
    /// [`InvocationRequest`].
    ///
    /// The resolved prompt becomes a single user message; a schema contract
    /// is appended as a structured-output instruction. Grounding flags have
    /// no uniform chat-completions surface and are dropped with a log line.
    fn build_request(&self, request: &InvocationRequest, stream: bool) -> CreateChatCompletionRequest {
        let mut content = request.prompt.clone();
        if let Some(schema) = &request.schema {
            content.push_str(&schema_instruction(schema));
        }

        if request.grounding.any() {
            debug!(
                provider = %self.provider_name,
                "search grounding is not supported by the chat completions adapter, ignoring"
            );
        }

        let model = if request.model_id.is_empty() {
            self.model.clone()
        } else {
            request.model_id.clone()
        };

        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(content),
                name: None,
            },
        )];

        let mut req = CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(DEFAULT_MAX_TOKENS),
            ..Default::default()
        };

        if stream {
            req.stream = Some(true);
        }

        req
    }
}

// OpenAiCompatibleProvider intentionally does NOT derive Debug to prevent
// accidental exposure of internal state including the API key inside the
// async-openai Client. Same pattern as AnthropicProvider.

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResponse, LlmError> {
        let oai_request = self.build_request(request, false);

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        // Extract content from the first choice
        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(InvocationResponse::text_only(text))
    }

    fn invoke_streaming(
        &self,
        request: InvocationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let oai_request = self.build_request(&request, true);

        // Clone the client for the 'static stream closure
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);
            while let Some(event) = inner.next().await {
                match event {
                    Ok(event) => yield event,
                    Err(e) => Err(e)?,
                }
            }
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
///
/// API errors keep the provider's own wording (prefixed with the error
/// type when present) because the retry classifier matches on substrings
/// of the message.
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let message = match api_err.r#type.as_deref() {
                Some(error_type) => format!("{error_type}: {}", api_err.message),
                None => api_err.message.clone(),
            };
            LlmError::Provider { message }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status() {
            Some(status) => LlmError::Provider {
                message: format!("HTTP {}: {err}", status.as_u16()),
            },
            None => LlmError::Transport {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => LlmError::Deserialization {
            message: content.clone(),
        },
        OpenAIError::StreamError(stream_err) => LlmError::Stream {
            message: stream_err.to_string(),
        },
        OpenAIError::InvalidArgument(message) => LlmError::Provider {
            message: message.clone(),
        },
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

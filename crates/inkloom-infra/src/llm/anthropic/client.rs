//! AnthropicProvider -- concrete [`LlmProvider`] implementation for the
//! Anthropic Messages API.
//!
//! Sends requests to `/v1/messages` with proper authentication headers.
//! Supports both non-streaming (`invoke`) and SSE streaming
//! (`invoke_streaming`) modes.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use inkloom_core::llm::kind::ProviderKind;
use inkloom_core::llm::provider::LlmProvider;
use inkloom_core::schema::schema_instruction;
use inkloom_types::llm::{InvocationRequest, InvocationResponse, LlmError, StreamEvent};

use super::streaming::create_message_stream;
use super::types::{
    AnthropicContentBlock, AnthropicMessage, AnthropicNonStreamResponse, AnthropicRequest,
    AnthropicTool, ErrorPayload,
};

/// Anthropic Claude LLM provider.
///
/// Implements [`LlmProvider`] for the Anthropic Messages API.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and is only exposed when
/// constructing HTTP request headers. It never appears in Debug output,
/// Display output, or tracing logs.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    /// The Anthropic API version header value.
    pub(super) const API_VERSION: &'static str = "2023-06-01";

    /// Output budget sent with every request. The invocation contract has
    /// no token accounting, so the adapter owns this ceiling.
    const DEFAULT_MAX_TOKENS: u32 = 8_192;

    /// Create a new Anthropic provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Anthropic API key wrapped in SecretString
    /// * `model` - Default model identifier (e.g., "claude-sonnet-4-20250514")
    pub fn new(api_key: SecretString, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300)) // 5 min timeout for long generations
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            model,
        }
    }

    /// The default model for this provider.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Build the full API URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`InvocationRequest`] into an [`AnthropicRequest`].
    ///
    /// The resolved prompt becomes a single user message; a schema contract
    /// is appended as a structured-output instruction. Web search grounding
    /// maps to the hosted search tool; URL-context grounding has no Messages
    /// API equivalent and is dropped with a log line.
    fn build_request(&self, request: &InvocationRequest, stream: bool) -> AnthropicRequest {
        let model = if request.model_id.is_empty() {
            self.model.clone()
        } else {
            request.model_id.clone()
        };

        let mut content = request.prompt.clone();
        if let Some(schema) = &request.schema {
            content.push_str(&schema_instruction(schema));
        }

        let tools = request
            .grounding
            .web_search
            .then(|| vec![AnthropicTool::web_search()]);
        if request.grounding.url_context {
            debug!("url context grounding is not supported by the messages API, ignoring");
        }

        AnthropicRequest {
            model,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content,
            }],
            stream,
            tools,
        }
    }
}

/// Render a non-2xx response into the message the retry classifier sees.
///
/// Prefers the provider's own error message from the JSON body, falls back
/// to the raw body, then to the status text. Always prefixed with the
/// numeric status so rate-limit classification can match on "429".
pub(super) fn provider_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.error.message)
        .filter(|message| !message.is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    format!("HTTP {}: {detail}", status.as_u16())
}

/// Collect web search result blocks into opaque grounding metadata.
fn grounding_metadata(content: &[AnthropicContentBlock]) -> Option<serde_json::Value> {
    let results: Vec<serde_json::Value> = content
        .iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::WebSearchToolResult { content } => Some(content.clone()),
            _ => None,
        })
        .collect();
    (!results.is_empty()).then(|| serde_json::Value::Array(results))
}

// AnthropicProvider intentionally does NOT derive Debug to prevent
// accidental exposure of internal state. The SecretString field ensures
// the API key is never printed, but we also omit Debug entirely.

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::AnthropicCompatible
    }

    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResponse, LlmError> {
        let body = self.build_request(request, false);
        let url = self.url("/v1/messages");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider {
                message: provider_error_message(status, &error_body),
            });
        }

        let parsed: AnthropicNonStreamResponse =
            response.json().await.map_err(|e| LlmError::Deserialization {
                message: e.to_string(),
            })?;

        // Extract text content from the response
        let text = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(InvocationResponse {
            text,
            grounding: grounding_metadata(&parsed.content),
        })
    }

    fn invoke_streaming(
        &self,
        request: InvocationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let body = self.build_request(&request, true);
        let url = self.url("/v1/messages");

        create_message_stream(&self.client, &url, body, &self.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkloom_types::llm::GroundingOptions;
    use inkloom_types::schema::Schema;

    fn make_provider() -> AnthropicProvider {
        AnthropicProvider::new(
            SecretString::from("test-key-not-real"),
            "claude-sonnet-4-20250514".to_string(),
        )
    }

    #[test]
    fn test_provider_name_and_kind() {
        let provider = make_provider();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.kind(), ProviderKind::AnthropicCompatible);
        assert!(provider.kind().requires_exclusive_dispatch());
    }

    #[test]
    fn test_base_url_override() {
        let provider = make_provider().with_base_url("http://localhost:8080".to_string());
        assert_eq!(provider.url("/v1/messages"), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_build_request_uses_configured_default_model() {
        let provider = make_provider();
        let request = InvocationRequest::text("", "Hello");
        let body = provider.build_request(&request, false);
        assert_eq!(body.model, "claude-sonnet-4-20250514");
        assert!(!body.stream);
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
        assert_eq!(body.messages[0].content, "Hello");
        assert!(body.tools.is_none());
    }

    #[test]
    fn test_build_request_prefers_request_model() {
        let provider = make_provider();
        let request = InvocationRequest::text("claude-opus-4-20250514", "Hello");
        let body = provider.build_request(&request, true);
        assert_eq!(body.model, "claude-opus-4-20250514");
        assert!(body.stream);
    }

    #[test]
    fn test_schema_contract_appends_instruction() {
        let provider = make_provider();
        let mut request = InvocationRequest::text("", "Write a chapter.");
        request.schema = Some(Schema::object(
            [("title", Schema::string()), ("body", Schema::string())],
            ["title", "body"],
        ));
        let body = provider.build_request(&request, false);
        let content = &body.messages[0].content;
        assert!(content.starts_with("Write a chapter."));
        assert!(content.contains("valid JSON"));
        assert!(content.contains("\"title\""));
    }

    #[test]
    fn test_web_search_grounding_adds_tool() {
        let provider = make_provider();
        let mut request = InvocationRequest::text("", "What happened today?");
        request.grounding = GroundingOptions {
            web_search: true,
            url_context: false,
        };
        let body = provider.build_request(&request, false);
        let tools = body.tools.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "web_search");
    }

    #[test]
    fn test_provider_error_message_prefers_api_body() {
        let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"Number of concurrent connections exceeded"}}"#;
        let message = provider_error_message(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(message, "HTTP 429: Number of concurrent connections exceeded");
    }

    #[test]
    fn test_provider_error_message_falls_back_to_raw_body() {
        let message =
            provider_error_message(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "upstream broke");
        assert_eq!(message, "HTTP 500: upstream broke");
    }

    #[test]
    fn test_provider_error_message_falls_back_to_status_text() {
        let message = provider_error_message(reqwest::StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(message, "HTTP 503: Service Unavailable");
    }

    #[test]
    fn test_grounding_metadata_collects_search_results() {
        let content = vec![
            AnthropicContentBlock::Text {
                text: "Answer".to_string(),
            },
            AnthropicContentBlock::WebSearchToolResult {
                content: serde_json::json!([{"url": "https://example.com"}]),
            },
        ];
        let metadata = grounding_metadata(&content).unwrap();
        assert_eq!(metadata[0][0]["url"], "https://example.com");
        assert!(grounding_metadata(&[]).is_none());
    }
}

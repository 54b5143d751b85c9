//! Anthropic SSE stream adapter.
//!
//! The Messages API streams server-sent events where the `event:` field
//! names the payload type and `data:` carries JSON. Only text deltas, the
//! terminal `message_stop`, and `error` events matter to the invocation
//! contract; the bookkeeping events (message_start, content_block_start,
//! content_block_stop, message_delta, ping) are skipped.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use inkloom_types::llm::{LlmError, StreamEvent};

use super::client::{AnthropicProvider, provider_error_message};
use super::types::{AnthropicDelta, AnthropicRequest, ContentBlockDeltaPayload, ErrorPayload};

/// Process one SSE event into zero or more [`StreamEvent`]s.
///
/// Pure over the event name and JSON data so the mapping is testable
/// without a network connection.
fn process_sse_event(event_type: &str, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
    match event_type {
        "content_block_delta" => {
            let payload: ContentBlockDeltaPayload =
                serde_json::from_str(data).map_err(|e| LlmError::Deserialization {
                    message: format!("content_block_delta: {e}"),
                })?;
            match payload.delta {
                AnthropicDelta::TextDelta { text } => Ok(vec![StreamEvent::TextDelta { text }]),
                // Thinking/tool-input deltas carry no response text.
                AnthropicDelta::Other => Ok(Vec::new()),
            }
        }

        "message_stop" => Ok(vec![StreamEvent::Done]),

        "error" => {
            let payload: ErrorPayload =
                serde_json::from_str(data).map_err(|e| LlmError::Deserialization {
                    message: format!("error event: {e}"),
                })?;
            Err(LlmError::Stream {
                message: format!("{}: {}", payload.error.error_type, payload.error.message),
            })
        }

        // Bookkeeping events; nothing to surface.
        "message_start" | "content_block_start" | "content_block_stop" | "message_delta"
        | "ping" => Ok(Vec::new()),

        unknown => {
            tracing::debug!(event_type = unknown, "unhandled message stream event, skipping");
            Ok(Vec::new())
        }
    }
}

/// Create a streaming connection to the Anthropic Messages API.
///
/// Sends the HTTP request, checks the response status, then reads the SSE
/// body. The stream ends after [`StreamEvent::Done`] (from `message_stop`);
/// dropping it mid-flight abandons the call.
///
/// # Arguments
///
/// * `client` - Shared reqwest HTTP client
/// * `url` - Full Messages API URL
/// * `body` - Serialized request with `stream: true`
/// * `api_key` - API key wrapped in SecretString
pub fn create_message_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicRequest,
    api_key: &SecretString,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    let client = client.clone();
    let url = url.to_string();
    let api_key = api_key.expose_secret().to_string();

    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .header("x-api-key", &api_key)
            .header("anthropic-version", AnthropicProvider::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let response = if status.is_success() {
            response
        } else {
            let error_body = response.text().await.unwrap_or_default();
            Err(LlmError::Provider {
                message: provider_error_message(status, &error_body),
            })?;
            unreachable!()
        };

        let mut events = response.bytes_stream().eventsource();
        'receive: while let Some(next) = events.next().await {
            let event = next.map_err(|e| LlmError::Stream {
                message: e.to_string(),
            })?;
            for mapped in process_sse_event(&event.event, &event.data)? {
                let done = matches!(mapped, StreamEvent::Done);
                yield mapped;
                if done {
                    // Servers close after message_stop; don't wait for EOF.
                    break 'receive;
                }
            }
        }
    })
}

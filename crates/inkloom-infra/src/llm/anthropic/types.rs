//! Anthropic Messages API types.
//!
//! These are Anthropic-specific request/response structures used for HTTP
//! communication with the Anthropic Messages API. They are NOT the generic
//! invocation types from inkloom-types -- those are provider-agnostic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
    pub stream: bool,
    /// Server-side tools. Populated with the web search tool when the
    /// request asks for search grounding. Skipped when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
}

/// A single message in an Anthropic conversation.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// A server-side tool declaration.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
}

impl AnthropicTool {
    /// The hosted web search tool.
    pub fn web_search() -> Self {
        Self {
            tool_type: "web_search_20250305".to_string(),
            name: "web_search".to_string(),
        }
    }
}

/// A content block in an Anthropic response.
///
/// Only text and web search result blocks are modeled; anything else the
/// API introduces deserializes to `Other` instead of failing the response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "web_search_tool_result")]
    WebSearchToolResult { content: Value },
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// SSE event payload structs
//
// The Anthropic SSE stream uses the `event:` field to name the event type
// (e.g., "content_block_delta", "message_stop") and the `data:` field
// contains JSON. We deserialize each payload into a specific struct based
// on the event type string -- NOT via serde tag on an outer enum.
// ---------------------------------------------------------------------------

/// Payload for `event: content_block_delta`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlockDeltaPayload {
    pub delta: AnthropicDelta,
}

/// Delta types within a content block.
///
/// Thinking, signature, and tool-input deltas carry no response text, so
/// they all collapse into `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// Payload for `event: error`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub error: AnthropicError,
}

/// An error from the Anthropic API.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Non-streaming response from the Anthropic Messages API.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicNonStreamResponse {
    pub id: String,
    pub content: Vec<AnthropicContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
}

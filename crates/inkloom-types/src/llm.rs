//! Provider-agnostic invocation types and errors.
//!
//! These types cross the boundary between the execution engine, the
//! resilience shell, and the concrete provider adapters. Adapter-specific
//! wire structures live in `inkloom-infra`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Search-grounding feature flags.
///
/// Part of the canonical request signature: changing any flag produces a
/// distinct cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundingOptions {
    #[serde(default)]
    pub web_search: bool,
    #[serde(default)]
    pub url_context: bool,
}

impl GroundingOptions {
    /// True when any grounding feature is requested.
    pub fn any(&self) -> bool {
        self.web_search || self.url_context
    }
}

/// A single prompt dispatch to a provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Provider model identifier; empty means "use the adapter's configured
    /// default".
    pub model_id: String,
    /// Fully resolved prompt text.
    pub prompt: String,
    /// Output contract; when present, adapters append a schema-derived
    /// "return valid JSON" instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<crate::schema::Schema>,
    #[serde(default)]
    pub grounding: GroundingOptions,
}

impl InvocationRequest {
    /// A plain text request with no schema and no grounding.
    pub fn text(model_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            prompt: prompt.into(),
            schema: None,
            grounding: GroundingOptions::default(),
        }
    }
}

/// The extracted answer from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    /// Raw response text.
    pub text: String,
    /// Opaque grounding metadata passed through when the provider returns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<Value>,
}

impl InvocationResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounding: None,
        }
    }
}

/// Events produced by the streaming invocation variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of response text.
    TextDelta { text: String },
    /// The stream completed normally.
    Done,
}

/// Errors from provider adapters and the resilience shell.
///
/// `Provider` carries the provider's own message (or `HTTP {status}:
/// {status text}` when unparseable) so the shell's substring classifier
/// sees the original markers. `MissingApiKey` is a configuration error:
/// raised locally, never retried, never preceded by network traffic.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("missing API key for model '{model}'")]
    MissingApiKey { model: String },

    #[error("{message}")]
    Provider { message: String },

    #[error("request failed: {message}")]
    Transport { message: String },

    #[error("failed to parse provider response: {message}")]
    Deserialization { message: String },

    #[error("stream error: {message}")]
    Stream { message: String },
}

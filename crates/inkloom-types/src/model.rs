//! Model provider configuration.
//!
//! `ModelConfig` is the externally persisted record resolving a model id to
//! credentials and an endpoint. The wire shape is camelCase (`modelId`,
//! `apiKey`, `apiUrl`, `isDefault`) to stay compatible with the editor's
//! exported configuration lists.

use serde::{Deserialize, Serialize};

/// Configuration for one model entry in the external store.
///
/// Invariant (held by the registry, not this type): across the active set
/// exactly one entry has `is_default = true` whenever the set is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Store-assigned identifier, referenced by agent node configs.
    pub id: String,
    /// Display name (also used by provider-classification heuristics).
    #[serde(default)]
    pub name: String,
    /// The provider's own model identifier (e.g. "claude-sonnet-4-20250514").
    pub model_id: String,
    /// API key; an empty key fails locally before any network call.
    #[serde(default)]
    pub api_key: String,
    /// Optional endpoint override; inspected to classify the provider family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Whether this entry is the current default.
    #[serde(default)]
    pub is_default: bool,
}

//! Exact-match response cache.
//!
//! Keys are the canonical request signature `(model_id, prompt, grounding
//! flags)`; values are full successful responses. Entries live for the
//! process lifetime with no expiry policy beyond the explicit
//! administrative clear. Errors are never inserted.

use dashmap::DashMap;

use inkloom_types::llm::{GroundingOptions, InvocationRequest, InvocationResponse};

/// Canonical request signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub model_id: String,
    pub prompt: String,
    pub grounding: GroundingOptions,
}

impl CacheKey {
    /// Derive the signature for a request. Deterministic: identical
    /// requests always map to the same key.
    pub fn of(request: &InvocationRequest) -> Self {
        Self {
            model_id: request.model_id.clone(),
            prompt: request.prompt.clone(),
            grounding: request.grounding,
        }
    }
}

/// Process-lifetime cache of successful invocations.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<CacheKey, InvocationResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<InvocationResponse> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    pub fn insert(&self, key: CacheKey, response: InvocationResponse) {
        self.entries.insert(key, response);
    }

    /// Drop all entries unconditionally; returns how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

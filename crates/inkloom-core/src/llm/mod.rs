//! LLM provider abstractions for Inkloom.
//!
//! This module defines the core traits and utilities for provider
//! integration:
//! - `LlmProvider`: RPITIT trait for concrete adapter implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `ProviderKind`: closed provider-family classification
//! - `ModelRegistry`: model configuration set with the sole-default invariant

pub mod box_provider;
pub mod kind;
pub mod provider;
pub mod registry;

pub use box_provider::BoxLlmProvider;
pub use kind::{classify_provider, ProviderKind};
pub use provider::{LlmProvider, ProviderFactory};
pub use registry::ModelRegistry;

//! LlmProvider trait definition.
//!
//! This is the core abstraction that all provider adapters implement.
//! Uses RPITIT for `invoke`, and `Pin<Box<dyn Stream>>` for
//! `invoke_streaming` (streams need to be object-safe for the
//! BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use inkloom_types::llm::{InvocationRequest, InvocationResponse, LlmError, StreamEvent};
use inkloom_types::model::ModelConfig;

use super::box_provider::BoxLlmProvider;
use super::kind::ProviderKind;

/// Trait for model provider adapters (Anthropic-compatible,
/// OpenAI-compatible, etc.).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition) for `invoke`.
/// The `invoke_streaming` method returns a boxed stream because streams need
/// to be object-safe for `BoxLlmProvider`.
///
/// Implementations live in inkloom-infra (e.g., `AnthropicProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable adapter name (e.g., "anthropic", "openai-compatible").
    fn name(&self) -> &str;

    /// Which provider family this adapter speaks to; drives the
    /// exclusive-dispatch gate in the resilience shell.
    fn kind(&self) -> ProviderKind;

    /// Send the prompt (with any schema instruction appended) and receive
    /// the full response text.
    fn invoke(
        &self,
        request: &InvocationRequest,
    ) -> impl std::future::Future<Output = Result<InvocationResponse, LlmError>> + Send;

    /// Send a streaming invocation. Returns a stream of text deltas ending
    /// with [`StreamEvent::Done`]; dropping the stream abandons the call.
    ///
    /// Returns a boxed stream (not RPITIT) because streams need to be
    /// object-safe for the `BoxLlmProvider` wrapper.
    fn invoke_streaming(
        &self,
        request: InvocationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}

/// Builds adapters from model configurations.
///
/// The heuristic mapping from a [`ModelConfig`] to a concrete adapter lives
/// behind this trait so the engine never names an HTTP client; the
/// infrastructure layer supplies the real factory and tests supply mocks.
pub trait ProviderFactory: Send + Sync {
    /// Build the adapter for `config`.
    ///
    /// Must fail with [`LlmError::MissingApiKey`] before any network
    /// activity when the configuration carries no credential.
    fn create(&self, config: &ModelConfig) -> Result<BoxLlmProvider, LlmError>;
}

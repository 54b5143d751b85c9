//! BoxLlmProvider -- object-safe dynamic dispatch wrapper for LlmProvider.
//!
//! 1. Define an object-safe `LlmProviderDyn` trait with boxed futures
//! 2. Blanket-impl `LlmProviderDyn` for all `T: LlmProvider`
//! 3. `BoxLlmProvider` wraps `Box<dyn LlmProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use inkloom_types::llm::{InvocationRequest, InvocationResponse, LlmError, StreamEvent};

use super::kind::ProviderKind;
use super::provider::LlmProvider;

/// Object-safe version of [`LlmProvider`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn LlmProviderDyn`).
/// A blanket implementation is provided for all types implementing `LlmProvider`.
pub trait LlmProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn invoke_boxed<'a>(
        &'a self,
        request: &'a InvocationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InvocationResponse, LlmError>> + Send + 'a>>;

    fn invoke_streaming_boxed(
        &self,
        request: InvocationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}

/// Blanket implementation: any `LlmProvider` automatically implements `LlmProviderDyn`.
impl<T: LlmProvider> LlmProviderDyn for T {
    fn name(&self) -> &str {
        LlmProvider::name(self)
    }

    fn kind(&self) -> ProviderKind {
        LlmProvider::kind(self)
    }

    fn invoke_boxed<'a>(
        &'a self,
        request: &'a InvocationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InvocationResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.invoke(request))
    }

    fn invoke_streaming_boxed(
        &self,
        request: InvocationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.invoke_streaming(request)
    }
}

/// Type-erased provider adapter for runtime selection.
///
/// Wraps any `LlmProvider` implementation behind dynamic dispatch, so the
/// resilience shell and the engine can hold heterogeneous adapters.
///
/// Since `LlmProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxLlmProvider` provides equivalent methods that delegate to
/// the inner `LlmProviderDyn` trait object.
pub struct BoxLlmProvider {
    inner: Box<dyn LlmProviderDyn + Send + Sync>,
}

impl std::fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxLlmProvider")
            .field("name", &self.inner.name())
            .field("kind", &self.inner.kind())
            .finish_non_exhaustive()
    }
}

impl BoxLlmProvider {
    /// Wrap a concrete `LlmProvider` in a type-erased box.
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    /// Human-readable adapter name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Provider family of the wrapped adapter.
    pub fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    /// Send the request and receive the full response.
    pub async fn invoke(
        &self,
        request: &InvocationRequest,
    ) -> Result<InvocationResponse, LlmError> {
        self.inner.invoke_boxed(request).await
    }

    /// Send a streaming invocation. Returns a stream of events.
    pub fn invoke_streaming(
        &self,
        request: InvocationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.inner.invoke_streaming_boxed(request)
    }
}

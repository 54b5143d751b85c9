//! The composed resilience shell: cache, gate, retry.
//!
//! One shell is constructed per process and shared by reference. All state
//! (the response cache and the gate flag) is owned by the instance, so tests
//! instantiate isolated shells instead of sharing globals.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use inkloom_types::llm::{InvocationRequest, InvocationResponse, LlmError, StreamEvent};

use super::cache::{CacheKey, ResponseCache};
use super::gate::ConcurrencyGate;
use super::retry::{
    normalize_error_message, RetryDecision, RetryMachine, RetryPolicy, RetryTimer, TokioTimer,
};
use crate::llm::BoxLlmProvider;

/// Wraps every provider dispatch with caching, exclusive-dispatch gating,
/// and classified retry.
pub struct ResilienceShell {
    cache: ResponseCache,
    gate: ConcurrencyGate,
    policy: RetryPolicy,
    timer: Box<dyn RetryTimer>,
}

impl ResilienceShell {
    pub fn new() -> Self {
        Self::with_timer(Box::new(TokioTimer))
    }

    /// Inject a timer; tests use a recording timer to observe backoff
    /// without sleeping.
    pub fn with_timer(timer: Box<dyn RetryTimer>) -> Self {
        Self {
            cache: ResponseCache::new(),
            gate: ConcurrencyGate::new(),
            policy: RetryPolicy::default(),
            timer,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Invoke under the shell's default retry policy.
    pub async fn invoke(
        &self,
        provider: &BoxLlmProvider,
        request: &InvocationRequest,
    ) -> Result<InvocationResponse, LlmError> {
        self.invoke_with_policy(provider, request, self.policy).await
    }

    /// Invoke with an explicit retry policy (nodes may carry their own
    /// retry budget).
    ///
    /// Order of operations per the shell contract:
    /// 1. exact-match cache lookup (hits return immediately),
    /// 2. exclusive-dispatch gate for gated provider families,
    /// 3. classified retry with backoff,
    /// 4. successful responses populate the cache; errors never do.
    pub async fn invoke_with_policy(
        &self,
        provider: &BoxLlmProvider,
        request: &InvocationRequest,
        policy: RetryPolicy,
    ) -> Result<InvocationResponse, LlmError> {
        let key = CacheKey::of(request);
        if let Some(hit) = self.cache.get(&key) {
            debug!(model = %request.model_id, "response cache hit");
            return Ok(hit);
        }

        let gated = provider.kind().requires_exclusive_dispatch();
        let mut machine = RetryMachine::new(policy);
        loop {
            let attempt = machine.begin_attempt();
            let result = {
                let _guard = if gated {
                    Some(self.gate.acquire().await)
                } else {
                    None
                };
                provider.invoke(request).await
                // Guard dropped here: the gate is released on success and
                // failure alike.
            };

            match result {
                Ok(response) => {
                    machine.record_success();
                    self.cache.insert(key, response.clone());
                    return Ok(response);
                }
                Err(error) => {
                    let message = normalize_error_message(&error.to_string());
                    match machine.record_failure(&message) {
                        RetryDecision::Retry { delay } => {
                            warn!(
                                attempt,
                                delay_secs = delay.as_secs(),
                                error = %message,
                                "invocation failed, backing off"
                            );
                            self.timer.sleep(delay).await;
                        }
                        RetryDecision::Abort => {
                            warn!(attempt, error = %message, "invocation aborted");
                            return Err(normalized(error));
                        }
                    }
                }
            }
        }
    }

    /// Streaming dispatch: gated like `invoke`, but never cached and never
    /// retried. The gate is held for the whole life of the stream; dropping
    /// the stream releases it and abandons the call.
    pub fn invoke_streaming(
        &self,
        provider: BoxLlmProvider,
        request: InvocationRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let gate = self.gate.clone();
        Box::pin(async_stream::stream! {
            let _guard = if provider.kind().requires_exclusive_dispatch() {
                Some(gate.acquire().await)
            } else {
                None
            };
            let mut inner = provider.invoke_streaming(request);
            while let Some(event) = inner.next().await {
                match event {
                    Ok(event) => yield Ok(event),
                    Err(error) => {
                        yield Err(normalized(error));
                        return;
                    }
                }
            }
        })
    }
}

impl Default for ResilienceShell {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite the transportable error variants with their normalized message;
/// structured variants pass through untouched.
fn normalized(error: LlmError) -> LlmError {
    match error {
        LlmError::Provider { message } => LlmError::Provider {
            message: normalize_error_message(&message),
        },
        LlmError::Transport { message } => LlmError::Transport {
            message: normalize_error_message(&message),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures_util::stream;

    use crate::llm::{LlmProvider, ProviderKind};

    type Scripted = VecDeque<Result<InvocationResponse, LlmError>>;

    struct MockProvider {
        kind: ProviderKind,
        script: Mutex<Scripted>,
        calls: Arc<AtomicU32>,
        delay: Duration,
        windows: Arc<Mutex<Vec<(tokio::time::Instant, tokio::time::Instant)>>>,
    }

    impl MockProvider {
        fn new(kind: ProviderKind, script: Vec<Result<InvocationResponse, LlmError>>) -> Self {
            Self {
                kind,
                script: Mutex::new(script.into()),
                calls: Arc::new(AtomicU32::new(0)),
                delay: Duration::ZERO,
                windows: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn always_ok(kind: ProviderKind) -> Self {
            Self::new(kind, Vec::new())
        }
    }

    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn invoke(
            &self,
            _request: &InvocationRequest,
        ) -> Result<InvocationResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let started = tokio::time::Instant::now();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.windows
                .lock()
                .unwrap()
                .push((started, tokio::time::Instant::now()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(InvocationResponse::text_only("ok")))
        }

        fn invoke_streaming(
            &self,
            _request: InvocationRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(stream::iter(vec![
                Ok(StreamEvent::TextDelta {
                    text: "chunk".to_string(),
                }),
                Ok(StreamEvent::Done),
            ]))
        }
    }

    struct RecordingTimer {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl RetryTimer for RecordingTimer {
        fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            self.sleeps.lock().unwrap().push(duration);
            Box::pin(std::future::ready(()))
        }
    }

    fn rate_limited() -> LlmError {
        LlmError::Provider {
            message: "429 rate limit".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_consumes_exactly_three_attempts() {
        let mock = MockProvider::new(
            ProviderKind::OpenAiCompatible,
            vec![
                Err(rate_limited()),
                Err(rate_limited()),
                Err(LlmError::Provider {
                    message: "429 final".to_string(),
                }),
            ],
        );
        let calls = Arc::clone(&mock.calls);
        let shell = ResilienceShell::new();

        let err = shell
            .invoke(&BoxLlmProvider::new(mock), &InvocationRequest::text("m", "p"))
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("429 final"));
        assert!(shell.cache().is_empty());
    }

    #[tokio::test]
    async fn client_error_aborts_without_retry() {
        let mock = MockProvider::new(
            ProviderKind::OpenAiCompatible,
            vec![Err(LlmError::Provider {
                message: "invalid request body".to_string(),
            })],
        );
        let calls = Arc::clone(&mock.calls);
        let shell = ResilienceShell::new();

        let err = shell
            .invoke(&BoxLlmProvider::new(mock), &InvocationRequest::text("m", "p"))
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.to_string().contains("invalid request body"));
    }

    #[tokio::test]
    async fn retry_after_directive_floors_the_backoff() {
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let shell = ResilienceShell::with_timer(Box::new(RecordingTimer {
            sleeps: Arc::clone(&sleeps),
        }));
        let mock = MockProvider::new(
            ProviderKind::OpenAiCompatible,
            vec![Err(LlmError::Provider {
                message: "429 too fast, retry-after: 5".to_string(),
            })],
        );

        shell
            .invoke(&BoxLlmProvider::new(mock), &InvocationRequest::text("m", "p"))
            .await
            .unwrap();

        let sleeps = sleeps.lock().unwrap();
        assert_eq!(sleeps.len(), 1);
        // Exponential term after attempt 1 is 2s; the directive floors it.
        assert!(sleeps[0] >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn identical_requests_hit_the_cache_once() {
        let mock = MockProvider::always_ok(ProviderKind::OpenAiCompatible);
        let calls = Arc::clone(&mock.calls);
        let provider = BoxLlmProvider::new(mock);
        let shell = ResilienceShell::new();
        let request = InvocationRequest::text("m", "write the opening scene");

        let first = shell.invoke(&provider, &request).await.unwrap();
        let second = shell.invoke(&provider, &request).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn any_key_field_change_misses_the_cache() {
        let mock = MockProvider::always_ok(ProviderKind::OpenAiCompatible);
        let calls = Arc::clone(&mock.calls);
        let provider = BoxLlmProvider::new(mock);
        let shell = ResilienceShell::new();

        shell
            .invoke(&provider, &InvocationRequest::text("m", "p"))
            .await
            .unwrap();
        shell
            .invoke(&provider, &InvocationRequest::text("m", "other"))
            .await
            .unwrap();
        let mut grounded = InvocationRequest::text("m", "p");
        grounded.grounding.web_search = true;
        shell.invoke(&provider, &grounded).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gated_invocations_never_overlap() {
        let mut first = MockProvider::always_ok(ProviderKind::AnthropicCompatible);
        first.delay = Duration::from_millis(100);
        let mut second = MockProvider::always_ok(ProviderKind::AnthropicCompatible);
        second.delay = Duration::from_millis(100);
        let windows = Arc::clone(&first.windows);
        second.windows = Arc::clone(&windows);

        let shell = Arc::new(ResilienceShell::new());
        let provider_a = BoxLlmProvider::new(first);
        let provider_b = BoxLlmProvider::new(second);

        let request_a = InvocationRequest::text("m", "a");
        let request_b = InvocationRequest::text("m", "b");
        let (a, b) = tokio::join!(
            shell.invoke(&provider_a, &request_a),
            shell.invoke(&provider_b, &request_b),
        );
        a.unwrap();
        b.unwrap();

        let windows = windows.lock().unwrap();
        assert_eq!(windows.len(), 2);
        assert!(
            windows[1].0 >= windows[0].1,
            "second dispatch {:?} began before first release {:?}",
            windows[1].0,
            windows[0].1
        );
    }

    #[tokio::test]
    async fn ungated_provider_skips_the_gate() {
        let mock = MockProvider::always_ok(ProviderKind::OpenAiCompatible);
        let provider = BoxLlmProvider::new(mock);
        let shell = ResilienceShell::new();
        // Pre-acquire the gate; an ungated provider must not block on it.
        let _guard = tokio::time::timeout(Duration::from_secs(1), async {
            let guard = shell.gate.acquire().await;
            shell
                .invoke(&provider, &InvocationRequest::text("m", "p"))
                .await
                .unwrap();
            guard
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn streaming_bypasses_cache_and_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let shell = ResilienceShell::new();
        let request = InvocationRequest::text("m", "p");

        // Identical requests: a cached path would dispatch only once.
        for _ in 0..2 {
            let mut mock = MockProvider::always_ok(ProviderKind::OpenAiCompatible);
            mock.calls = Arc::clone(&calls);
            let mut stream = shell.invoke_streaming(BoxLlmProvider::new(mock), request.clone());
            let mut saw_done = false;
            while let Some(event) = stream.next().await {
                if matches!(event.unwrap(), StreamEvent::Done) {
                    saw_done = true;
                }
            }
            assert!(saw_done);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(shell.cache().is_empty());
    }

    #[tokio::test]
    async fn surfaced_errors_are_normalized() {
        let mock = MockProvider::new(
            ProviderKind::OpenAiCompatible,
            vec![Err(LlmError::Provider {
                message: "[SomeSdk Error]: model not found".to_string(),
            })],
        );
        let shell = ResilienceShell::new();

        let err = shell
            .invoke(&BoxLlmProvider::new(mock), &InvocationRequest::text("m", "p"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "model not found");
    }
}

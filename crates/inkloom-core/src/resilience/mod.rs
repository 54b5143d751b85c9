//! The resilience shell around provider adapters.
//!
//! Every agent invocation flows through this module:
//! - `cache` -- exact-match response cache keyed by canonical request signature
//! - `gate` -- binary concurrency gate for provider families with an
//!   organization-wide single-flight ceiling
//! - `retry` -- error classification, message normalization, and the
//!   explicit retry state machine with classified backoff
//! - `shell` -- the composed wrapper the engine calls

pub mod cache;
pub mod gate;
pub mod retry;
pub mod shell;

pub use cache::{CacheKey, ResponseCache};
pub use gate::ConcurrencyGate;
pub use retry::{
    backoff_delay, classify_error, normalize_error_message, parse_retry_after, ErrorClass,
    RetryDecision, RetryMachine, RetryPolicy, RetryState, RetryTimer, TokioTimer,
};
pub use shell::ResilienceShell;

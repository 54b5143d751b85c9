//! Error classification, message normalization, and the retry state machine.
//!
//! Classification is a case-insensitive substring match over the normalized
//! error message. Only rate-limit and server classes are retried; anything
//! else aborts immediately. Backoff is exponential (`2^attempt` seconds)
//! with a floor taken from an explicit provider directive ("retry-after: N",
//! "try again after N") when one is present in the message.
//!
//! The retry loop itself is an explicit state machine
//! (`Idle -> Attempting(n) -> Backoff(n) -> Succeeded | Failed`) driven by a
//! scheduler-agnostic timer, so tests can step it without real sleeping.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Substrings that mark a rate-limit error (matched case-insensitively).
const RATE_LIMIT_MARKERS: [&str; 8] = [
    "429",
    "quota",
    "rate limit",
    "rate_limit",
    "resource_exhausted",
    "concurrency",
    "retry-after",
    "try again after",
];

/// Substrings that mark a retryable server-side error.
const SERVER_MARKERS: [&str; 5] = [
    "500",
    "internal error",
    "server error",
    "service unavailable",
    "internal",
];

/// The retry-relevant class of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    RateLimit,
    Server,
    Client,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Client)
    }
}

/// Classify an error message. Rate-limit markers win over server markers;
/// everything unmatched is a client error and is never retried.
pub fn classify_error(message: &str) -> ErrorClass {
    let lower = message.to_ascii_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorClass::RateLimit;
    }
    if SERVER_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorClass::Server;
    }
    ErrorClass::Client
}

/// Strip SDK-style boilerplate so classification and user-facing messages
/// are consistent across providers.
///
/// Removes leading `[Some SDK Tag]:` groups and `Error:` prefixes,
/// repeatedly. A bracket group not followed by a colon (for example a bare
/// `[429 Too Many Requests]` status marker) is kept intact.
pub fn normalize_error_message(message: &str) -> String {
    let mut rest = message.trim();
    loop {
        if let Some(after_bracket) = strip_bracket_tag(rest) {
            rest = after_bracket;
            continue;
        }
        let lower = rest.to_ascii_lowercase();
        if lower.starts_with("error:") {
            rest = rest["error:".len()..].trim_start();
            continue;
        }
        break;
    }
    rest.to_string()
}

/// Strip a leading `[...]:` group. Returns `None` when the text does not
/// start with one (including the bare-bracket case with no trailing colon).
fn strip_bracket_tag(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('[')?;
    let close = inner.find(']')?;
    let after = inner[close + 1..].trim_start();
    let after_colon = after.strip_prefix(':')?;
    Some(after_colon.trim_start())
}

/// Extract an explicit retry directive (`retry-after: N`,
/// `try again after N`) from an error message, in seconds.
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let lower = message.to_ascii_lowercase();
    for marker in ["try again after", "retry-after"] {
        if let Some(position) = lower.find(marker) {
            let rest = lower[position + marker.len()..]
                .trim_start_matches(|c: char| c == ':' || c == '=' || c == '"' || c.is_whitespace());
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            if let Ok(seconds) = digits.parse::<u64>() {
                return Some(Duration::from_secs(seconds));
            }
        }
    }
    None
}

/// Delay before the attempt after `attempt` (1-based) failed:
/// `2^attempt` seconds, floored by any explicit directive in the message.
pub fn backoff_delay(attempt: u32, message: &str) -> Duration {
    let exponential = Duration::from_secs(1u64 << attempt.min(16));
    match parse_retry_after(message) {
        Some(directive) => exponential.max(directive),
        None => exponential,
    }
}

/// How many dispatch attempts a single invocation may consume in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Where a single invocation stands in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Succeeded,
    Failed,
}

/// What the driver should do after a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    Abort,
}

/// Explicit retry state machine. The driver (the resilience shell, or a
/// test) owns the clock: it calls `begin_attempt`, runs the call, records
/// the outcome, and sleeps the returned delay itself.
#[derive(Debug)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: RetryState,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Transition into the next attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        let attempt = match self.state {
            RetryState::Idle => 1,
            RetryState::Backoff { attempt, .. } => attempt + 1,
            RetryState::Attempting { attempt } => attempt,
            RetryState::Succeeded | RetryState::Failed => self.policy.max_attempts,
        };
        self.state = RetryState::Attempting { attempt };
        attempt
    }

    pub fn record_success(&mut self) {
        self.state = RetryState::Succeeded;
    }

    /// Record a failed attempt; classifies the (already normalized) message
    /// and decides between backing off and aborting.
    pub fn record_failure(&mut self, message: &str) -> RetryDecision {
        let attempt = match self.state {
            RetryState::Attempting { attempt } => attempt,
            _ => self.policy.max_attempts,
        };
        let class = classify_error(message);
        if class.is_retryable() && attempt < self.policy.max_attempts {
            let delay = backoff_delay(attempt, message);
            self.state = RetryState::Backoff { attempt, delay };
            RetryDecision::Retry { delay }
        } else {
            self.state = RetryState::Failed;
            RetryDecision::Abort
        }
    }
}

/// Scheduler-agnostic sleep, so retry timing is testable without waiting.
pub trait RetryTimer: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// The production timer: `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl RetryTimer for TokioTimer {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_markers_classify() {
        for message in [
            "HTTP 429",
            "Quota exceeded for project",
            "Rate limit reached",
            "rate_limit_error",
            "RESOURCE_EXHAUSTED",
            "concurrency ceiling hit",
            "Retry-After: 30",
            "Please try again after 12 seconds",
        ] {
            assert_eq!(classify_error(message), ErrorClass::RateLimit, "{message}");
        }
    }

    #[test]
    fn server_markers_classify() {
        for message in [
            "HTTP 500",
            "Internal Error",
            "upstream server error",
            "Service Unavailable",
            "something internal broke",
        ] {
            assert_eq!(classify_error(message), ErrorClass::Server, "{message}");
        }
    }

    #[test]
    fn unmatched_messages_are_client_errors() {
        assert_eq!(classify_error("invalid request body"), ErrorClass::Client);
        assert_eq!(classify_error("404 model not found"), ErrorClass::Client);
        assert!(!ErrorClass::Client.is_retryable());
    }

    #[test]
    fn rate_limit_wins_over_server() {
        // "internal" also matches the server table; 429 must win.
        assert_eq!(
            classify_error("429 internal throttling"),
            ErrorClass::RateLimit
        );
    }

    #[test]
    fn normalization_strips_sdk_prefixes() {
        assert_eq!(
            normalize_error_message("[GoogleGenerativeAI Error]: quota exceeded"),
            "quota exceeded"
        );
        assert_eq!(
            normalize_error_message("Error: [SDK]: Error: boom"),
            "boom"
        );
        assert_eq!(normalize_error_message("  plain message "), "plain message");
    }

    #[test]
    fn normalization_keeps_bare_status_brackets() {
        assert_eq!(
            normalize_error_message("[429 Too Many Requests] quota exhausted"),
            "[429 Too Many Requests] quota exhausted"
        );
    }

    #[test]
    fn retry_after_directive_parses() {
        assert_eq!(
            parse_retry_after("retry-after: 5"),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            parse_retry_after("Please try again after 12 seconds"),
            Some(Duration::from_secs(12))
        );
        assert_eq!(
            parse_retry_after("Retry-After=30"),
            Some(Duration::from_secs(30))
        );
        assert_eq!(parse_retry_after("retry-after header absent"), None);
        assert_eq!(parse_retry_after("just a rate limit"), None);
    }

    #[test]
    fn backoff_is_exponential_with_directive_floor() {
        assert_eq!(backoff_delay(1, "500"), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, "500"), Duration::from_secs(4));
        // Directive floor exceeds the exponential term.
        assert_eq!(
            backoff_delay(1, "429 retry-after: 5"),
            Duration::from_secs(5)
        );
        // Exponential term exceeds the directive.
        assert_eq!(
            backoff_delay(3, "429 retry-after: 5"),
            Duration::from_secs(8)
        );
    }

    #[test]
    fn machine_walks_three_attempts_then_fails() {
        let mut machine = RetryMachine::new(RetryPolicy::default());
        assert_eq!(machine.state(), RetryState::Idle);

        assert_eq!(machine.begin_attempt(), 1);
        assert!(matches!(
            machine.record_failure("429"),
            RetryDecision::Retry { .. }
        ));
        assert_eq!(machine.begin_attempt(), 2);
        assert!(matches!(
            machine.record_failure("429"),
            RetryDecision::Retry { .. }
        ));
        assert_eq!(machine.begin_attempt(), 3);
        assert_eq!(machine.record_failure("429"), RetryDecision::Abort);
        assert_eq!(machine.state(), RetryState::Failed);
    }

    #[test]
    fn machine_aborts_immediately_on_client_error() {
        let mut machine = RetryMachine::new(RetryPolicy::default());
        machine.begin_attempt();
        assert_eq!(
            machine.record_failure("invalid request"),
            RetryDecision::Abort
        );
        assert_eq!(machine.state(), RetryState::Failed);
    }

    #[test]
    fn machine_reports_success() {
        let mut machine = RetryMachine::new(RetryPolicy::new(1));
        machine.begin_attempt();
        machine.record_success();
        assert_eq!(machine.state(), RetryState::Succeeded);
    }

    #[test]
    fn backoff_state_carries_the_delay() {
        let mut machine = RetryMachine::new(RetryPolicy::default());
        machine.begin_attempt();
        machine.record_failure("server error, retry-after: 9");
        assert_eq!(
            machine.state(),
            RetryState::Backoff {
                attempt: 1,
                delay: Duration::from_secs(9)
            }
        );
    }
}

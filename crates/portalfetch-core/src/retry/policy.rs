use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;

use super::backoff::backoff_delay;

/// High-level classification of an error for retry purposes.
///
/// Callers map transport errors, HTTP status codes and decode failures into
/// these kinds; retry predicates only ever see the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response within the per-call bound. Fails fast, never retried by default.
    Timeout,
    /// Server asked us to slow down (HTTP 429).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Server error (5xx).
    Http5xx(u16),
    /// Client error (4xx other than 429).
    Http4xx(u16),
    /// Any other error (malformed body, invalid request); not retried.
    Other,
}

/// Named retry classification strategies.
#[derive(Debug, Clone, Copy, Default)]
pub enum RetryPredicate {
    /// Retry connection failures, 5xx and 429.
    #[default]
    Default,
    /// Retry only connection failures; any response from the server is final.
    ConnectionOnly,
    /// Never retry.
    Never,
    /// Caller-supplied classification.
    Custom(fn(ErrorKind) -> bool),
}

impl RetryPredicate {
    pub fn should_retry(&self, kind: ErrorKind) -> bool {
        match self {
            RetryPredicate::Default => matches!(
                kind,
                ErrorKind::Connection | ErrorKind::Throttled | ErrorKind::Http5xx(_)
            ),
            RetryPredicate::ConnectionOnly => kind == ErrorKind::Connection,
            RetryPredicate::Never => false,
            RetryPredicate::Custom(f) => f(kind),
        }
    }
}

/// Observer invoked with `(attempt, error)` before each backoff sleep.
/// Must not panic.
pub type OnRetry = Arc<dyn Fn(u32, &dyn std::error::Error) + Send + Sync>;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with jitter and caps.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Values below 1 act as 1.
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on the un-jittered backoff delay.
    pub max_delay: Duration,
    /// Multiplicative jitter in `[0, 1)`.
    pub jitter_factor: f64,
    pub retry_on: RetryPredicate,
    pub on_retry: Option<OnRetry>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter_factor", &self.jitter_factor)
            .field("retry_on", &self.retry_on)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            jitter_factor: 0.1,
            retry_on: RetryPredicate::Default,
            on_retry: None,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            jitter_factor: cfg.jitter_factor,
            ..Self::default()
        }
    }

    pub fn with_predicate(mut self, retry_on: RetryPredicate) -> Self {
        self.retry_on = retry_on;
        self
    }

    pub fn with_on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, &dyn std::error::Error) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(f));
        self
    }

    /// Decide what to do after attempt `attempt` (1-based) failed with `kind`.
    ///
    /// Returns `RetryDecision::NoRetry` on the last attempt or when the
    /// predicate rejects the error.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts.max(1) {
            return RetryDecision::NoRetry;
        }
        if !self.retry_on.should_retry(kind) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(backoff_delay(attempt, self))
    }
}

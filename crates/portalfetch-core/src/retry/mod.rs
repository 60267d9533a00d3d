//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures, status codes), jittered exponential backoff, and the
//! async retry loop so that the HTTP wrapper, the idempotency store and the
//! fallback resolver share one consistent policy.

mod backoff;
mod classify;
mod policy;
mod run;

pub use backoff::{backoff_delay, backoff_delay_with_sample};
pub use classify::{classify_curl_error, classify_http_status, Classify};
pub use policy::{ErrorKind, OnRetry, RetryDecision, RetryPolicy, RetryPredicate};
pub use run::execute_with_retry;

//! Jittered exponential backoff.

use rand::Rng;
use std::time::Duration;

use super::policy::RetryPolicy;

/// Delay before the retry that follows failed attempt `attempt` (1-based).
///
/// `min(base * 2^(attempt-1), max_delay)` grown by up to `jitter_factor` of itself.
pub fn backoff_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let sample: f64 = rand::thread_rng().gen();
    backoff_delay_with_sample(attempt, policy, sample)
}

/// Same as [`backoff_delay`] with the uniform `[0, 1)` sample supplied by the caller.
pub fn backoff_delay_with_sample(attempt: u32, policy: &RetryPolicy, sample: f64) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let exp = policy
        .base_delay
        .saturating_mul(1u32 << shift)
        .min(policy.max_delay);
    let jitter = policy.jitter_factor.clamp(0.0, 1.0) * sample.clamp(0.0, 1.0);
    let millis = exp.as_secs_f64() * 1000.0 * (1.0 + jitter);
    Duration::from_millis(millis.floor() as u64)
}

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::DEFAULT_IDEMPOTENCY_TTL;

/// Key and time-to-live for one idempotent call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    pub key: String,
    pub ttl: Duration,
}

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: DEFAULT_IDEMPOTENCY_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// A stored successful result. Never mutated; replaced wholesale.
pub(super) struct IdempotencyEntry {
    pub(super) result: Arc<dyn Any + Send + Sync>,
    pub(super) stored_at: Instant,
    pub(super) ttl: Duration,
}

impl IdempotencyEntry {
    pub(super) fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

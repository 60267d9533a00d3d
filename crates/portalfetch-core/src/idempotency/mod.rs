//! Idempotency-keyed result reuse.
//!
//! A process-local store of successful results keyed by caller-chosen
//! idempotency keys. A call carrying a key whose result is still fresh returns
//! that result without running the operation again; failures are never stored.
//!
//! The store is constructed explicitly and shared by cloning the handle; it
//! holds no persisted or cross-process state.

mod entry;
mod store;

pub use entry::IdempotencyKey;
pub use store::IdempotencyStore;

use std::time::Duration;

/// Lifetime of a stored result when the caller does not pick one.
pub const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::from_secs(3600);

/// Request header carrying the key to servers that honor it.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

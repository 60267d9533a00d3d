//! Content-aware TTL cache.
//!
//! Process-local map from request fingerprint to JSON payload. The lifetime
//! of an entry is chosen by the content classification of the payload
//! (breaking news is never cached, recommendations live longest). Supports
//! substring-based bulk invalidation after upstream mutations.

mod fingerprint;
mod kind;
mod store;

pub use fingerprint::Fingerprint;
pub use kind::{ContentKind, TtlTable};
pub use store::ContentCache;

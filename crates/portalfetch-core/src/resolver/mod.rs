//! Multi-source fallback resolution.
//!
//! Locates one entity across an ordered list of candidate origins: the first
//! origin that answers with a present result wins, failures move on to the
//! next origin, and the result records which tier answered. Exhausting every
//! origin yields an absent entity, never an error.

mod fallback;
mod presence;
mod source;

pub use fallback::{FallbackResolver, ResolveOptions};
pub use presence::Presence;
pub use source::SourceCandidate;

use serde::Serialize;
use std::time::Duration;

/// Which tier produced a lookup result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Primary,
    Fallback,
    Cache,
}

/// Outcome of one resolution, with provenance. Built fresh per call.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResult<T> {
    /// `None` when no candidate produced the entity ("content unavailable").
    pub entity: Option<T>,
    pub source: SourceTier,
    pub fallback_used: bool,
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
    /// Origin that answered; `None` for cache hits and misses.
    pub origin: Option<String>,
}

impl<T> LookupResult<T> {
    pub fn is_found(&self) -> bool {
        self.entity.is_some()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

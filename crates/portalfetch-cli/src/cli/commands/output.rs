//! Shared client construction and result printing for lookup commands.

use anyhow::Result;
use portalfetch_core::config::PortalConfig;
use portalfetch_core::portal::PortalClient;
use portalfetch_core::resolver::{LookupResult, SourceCandidate};
use serde_json::Value;

use crate::cli::SourceArgs;

/// Client for the configured sources, or for `--source` overrides when given.
pub(super) fn build_client(cfg: &PortalConfig, sources: &SourceArgs) -> PortalClient {
    let client = PortalClient::new(cfg);
    if sources.sources.is_empty() {
        client
    } else {
        client.with_sources(SourceCandidate::list(sources.sources.iter().cloned()))
    }
}

/// Print provenance, then the entity as pretty JSON or "content unavailable".
pub(super) fn print_lookup(what: &str, result: &LookupResult<Value>) -> Result<()> {
    println!(
        "{:<10} {:<8} {:<9} {:>8}  {}",
        "SOURCE", "FALLBACK", "FOUND", "MS", "ORIGIN"
    );
    println!(
        "{:<10} {:<8} {:<9} {:>8}  {}",
        format!("{:?}", result.source).to_lowercase(),
        result.fallback_used,
        result.is_found(),
        result.elapsed.as_millis(),
        result.origin.as_deref().unwrap_or("-")
    );
    match &result.entity {
        Some(entity) => println!("{}", serde_json::to_string_pretty(entity)?),
        None => println!("{what}: content unavailable"),
    }
    Ok(())
}

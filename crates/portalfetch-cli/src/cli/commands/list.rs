//! `portalfetch list <listing>` – fetch a listing page.

use anyhow::Result;
use portalfetch_core::config::PortalConfig;
use portalfetch_core::portal::Listing;
use std::collections::BTreeMap;

use super::output::{build_client, print_lookup};
use crate::cli::SourceArgs;

pub async fn run_list(
    cfg: &PortalConfig,
    listing: Listing,
    params: Vec<(String, String)>,
    sources: &SourceArgs,
) -> Result<()> {
    let client = build_client(cfg, sources);
    let params: BTreeMap<String, String> = params.into_iter().collect();
    let result = client.listing(listing, &params).await;
    tracing::info!(
        listing = %listing,
        source = ?result.source,
        fallback_used = result.fallback_used,
        "listing lookup finished"
    );
    print_lookup(&format!("listing {listing}"), &result)
}

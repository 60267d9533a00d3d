//! `portalfetch article <slug>` – resolve an article across sources.

use anyhow::Result;
use portalfetch_core::config::PortalConfig;

use super::output::{build_client, print_lookup};
use crate::cli::SourceArgs;

pub async fn run_article(cfg: &PortalConfig, slug: &str, sources: &SourceArgs) -> Result<()> {
    let client = build_client(cfg, sources);
    let result = client.article(slug).await;
    tracing::info!(
        slug,
        source = ?result.source,
        fallback_used = result.fallback_used,
        "article lookup finished"
    );
    print_lookup(&format!("article {slug}"), &result)
}

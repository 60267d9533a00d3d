//! `portalfetch config` – show where config lives and what is in effect.

use anyhow::Result;
use portalfetch_core::config::PortalConfig;
use std::path::Path;

pub fn run_config(cfg: &PortalConfig, path: &Path) -> Result<()> {
    println!("# {}", path.display());
    print!("{}", cfg.to_effective_toml()?);
    Ok(())
}

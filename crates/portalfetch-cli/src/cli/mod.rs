//! CLI for the portalfetch content fetch layer.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use portalfetch_core::config;
use portalfetch_core::portal::Listing;
use std::path::PathBuf;

use commands::{run_article, run_config, run_list};

/// Top-level CLI for portalfetch.
#[derive(Debug, Parser)]
#[command(name = "portalfetch")]
#[command(about = "portalfetch: resilient content API fetches with retry, cache and source fallback", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the XDG config path.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Origin overrides shared by lookup commands.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Origin to query instead of the configured sources; repeat in preference order.
    #[arg(long = "source", value_name = "URL")]
    pub sources: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve an article by slug across the configured sources.
    Article {
        /// Article slug.
        slug: String,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Fetch a listing (channels, categories, topics, trending, hot, breaking, recommend).
    List {
        listing: Listing,

        /// Query parameter as key=value; repeatable.
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Show the config path and the effective configuration.
    Config,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (k, v) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if k.trim().is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    Ok((k.trim().to_string(), v.to_string()))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let (cfg, path) = match &cli.config {
            Some(path) => (config::load_from_path(path)?, path.clone()),
            None => (config::load_or_init()?, config::config_path()?),
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Article { slug, sources } => run_article(&cfg, &slug, &sources).await?,
            CliCommand::List {
                listing,
                params,
                sources,
            } => run_list(&cfg, listing, params, &sources).await?,
            CliCommand::Config => run_config(&cfg, &path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

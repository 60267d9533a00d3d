//! Tracing setup.
//!
//! Events go to an append-only file in the XDG state directory. Callers that
//! cannot use that directory fall back to [`init_logging_stderr`].

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,portalfetch_core=debug";
const LOG_FILE_NAME: &str = "portalfetch.log";

/// `$XDG_STATE_HOME/portalfetch/portalfetch.log`; parent directories are created.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("portalfetch")?;
    xdg_dirs
        .place_state_file(LOG_FILE_NAME)
        .context("creating log directory")
}

/// Log to the XDG state file; returns its path.
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    init_logging_to(&path)?;
    Ok(path)
}

/// Log to `path`, appending. Fails if the file cannot be opened or a
/// subscriber is already installed.
pub fn init_logging_to(path: &Path) -> Result<()> {
    let file = Arc::new(open_append(path)?);
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(file)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    tracing::info!(path = %path.display(), "logging to file");
    Ok(())
}

/// Stderr-only logging. A no-op if a subscriber is already installed.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(io::stderr)
        .try_init();
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

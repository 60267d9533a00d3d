use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per call (including the first).
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
    /// Maximum (un-jittered) backoff delay in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplicative jitter in [0, 1).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            jitter_factor: 0.1,
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout; an attempt that exceeds it is cancelled and not retried.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            user_agent: concat!("portalfetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    /// How long a successful result is reused for the same idempotency key.
    pub ttl_secs: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

/// Cache lifetime per content classification, in seconds. Zero disables caching for that kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub breaking: u64,
    pub hot: u64,
    pub trending: u64,
    pub normal: u64,
    pub recommend: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            breaking: 0,
            hot: 5,
            trending: 10,
            normal: 15,
            recommend: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/portalfetch/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Content API origins in preference order; the first is the primary source.
    pub sources: Vec<String>,
    #[serde(default)]
    pub http: HttpConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            sources: vec!["http://127.0.0.1:8080".to_string()],
            http: HttpConfig::default(),
            retry: None,
            idempotency: IdempotencyConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Effective retry parameters (configured section or defaults).
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// TOML rendering with the effective retry section filled in.
    pub fn to_effective_toml(&self) -> Result<String> {
        let mut effective = self.clone();
        effective.retry = Some(self.retry_config());
        Ok(toml::to_string_pretty(&effective)?)
    }

    /// Reject configurations that would make the fetch layer misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("config: at least one source is required");
        }
        for source in &self.sources {
            let parsed = url::Url::parse(source)
                .with_context(|| format!("config: invalid source URL {source}"))?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                anyhow::bail!("config: source must be an absolute http(s) URL: {source}");
            }
        }
        let retry = self.retry_config();
        if retry.max_attempts < 1 {
            anyhow::bail!("config: retry.max_attempts must be at least 1");
        }
        if !(0.0..1.0).contains(&retry.jitter_factor) {
            anyhow::bail!(
                "config: retry.jitter_factor must be in [0, 1), got {}",
                retry.jitter_factor
            );
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            anyhow::bail!("config: retry.base_delay_ms exceeds retry.max_delay_ms");
        }
        if self.http.timeout_secs == 0 || self.http.connect_timeout_secs == 0 {
            anyhow::bail!("config: http.timeout_secs and http.connect_timeout_secs must be positive");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("portalfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PortalConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PortalConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<PortalConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: PortalConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::CacheConfig;

/// Content classification that selects a cache lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Breaking,
    Hot,
    Trending,
    #[default]
    Normal,
    Recommend,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Breaking,
        ContentKind::Hot,
        ContentKind::Trending,
        ContentKind::Normal,
        ContentKind::Recommend,
    ];

    /// Parse a classification label; unknown labels fall back to `Normal`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "breaking" => ContentKind::Breaking,
            "hot" => ContentKind::Hot,
            "trending" => ContentKind::Trending,
            "recommend" | "recommended" => ContentKind::Recommend,
            _ => ContentKind::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Breaking => "breaking",
            ContentKind::Hot => "hot",
            ContentKind::Trending => "trending",
            ContentKind::Normal => "normal",
            ContentKind::Recommend => "recommend",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache lifetime per content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlTable {
    pub breaking: Duration,
    pub hot: Duration,
    pub trending: Duration,
    pub normal: Duration,
    pub recommend: Duration,
}

impl Default for TtlTable {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl TtlTable {
    pub fn from_config(cfg: &CacheConfig) -> Self {
        Self {
            breaking: Duration::from_secs(cfg.breaking),
            hot: Duration::from_secs(cfg.hot),
            trending: Duration::from_secs(cfg.trending),
            normal: Duration::from_secs(cfg.normal),
            recommend: Duration::from_secs(cfg.recommend),
        }
    }

    pub fn ttl(&self, kind: ContentKind) -> Duration {
        match kind {
            ContentKind::Breaking => self.breaking,
            ContentKind::Hot => self.hot,
            ContentKind::Trending => self.trending,
            ContentKind::Normal => self.normal,
            ContentKind::Recommend => self.recommend,
        }
    }
}

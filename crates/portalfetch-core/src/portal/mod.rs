//! Portal client: article and listing lookups over the configured origins.
//!
//! Owns one HTTP wrapper, one idempotency store and one content cache, all
//! built from [`PortalConfig`] at startup and shared by every lookup.

mod listing;

pub use listing::{Listing, UnknownListing};

use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::cache::{ContentCache, ContentKind, TtlTable};
use crate::config::PortalConfig;
use crate::http::{FetchError, FetchRequest, HttpClient};
use crate::idempotency::{IdempotencyKey, IdempotencyStore};
use crate::resolver::{FallbackResolver, LookupResult, ResolveOptions, SourceCandidate};
use crate::retry::RetryPolicy;

pub const ARTICLE_PATH: &str = "/api/articles/{key}";

#[derive(Debug, Clone)]
pub struct PortalClient {
    resolver: FallbackResolver,
    cache: ContentCache,
    sources: Vec<SourceCandidate>,
    policy: RetryPolicy,
    idempotency_ttl: Duration,
}

impl PortalClient {
    pub fn new(cfg: &PortalConfig) -> Self {
        let idempotency = IdempotencyStore::new();
        let cache = ContentCache::new(TtlTable::from_config(&cfg.cache));
        let http = HttpClient::from_config(&cfg.http, idempotency);
        Self {
            resolver: FallbackResolver::new(http).with_cache(cache.clone()),
            cache,
            sources: SourceCandidate::list(cfg.sources.iter().cloned()),
            policy: RetryPolicy::from_config(&cfg.retry_config()),
            idempotency_ttl: Duration::from_secs(cfg.idempotency.ttl_secs),
        }
    }

    /// Replace the configured origins (order preserved).
    pub fn with_sources(mut self, sources: Vec<SourceCandidate>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn idempotency(&self) -> &IdempotencyStore {
        self.resolver.http().idempotency()
    }

    /// Article by slug, tried on every origin in order.
    pub async fn article(&self, slug: &str) -> LookupResult<Value> {
        let options = ResolveOptions::new(ARTICLE_PATH)
            .policy(self.policy.clone())
            .cached_as(ContentKind::Normal);
        self.resolver.resolve(slug, &self.sources, &options).await
    }

    /// A listing page; `params` become query parameters and part of the cache key.
    pub async fn listing(
        &self,
        listing: Listing,
        params: &BTreeMap<String, String>,
    ) -> LookupResult<Value> {
        let mut options = ResolveOptions::new(listing.path())
            .policy(self.policy.clone())
            .cached_as(listing.content_kind());
        options.query = params.clone();
        self.resolver
            .resolve(listing.name(), &self.sources, &options)
            .await
    }

    /// JSON write to the primary origin, deduplicated by `idempotency_key`.
    ///
    /// The key is sent as `Idempotency-Key`; a repeat within the configured
    /// idempotency TTL returns the first response without a second request.
    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        idempotency_key: Option<&str>,
    ) -> Result<Value, FetchError> {
        let primary = self
            .sources
            .first()
            .ok_or_else(|| FetchError::InvalidRequest("no sources configured".to_string()))?;
        let request = FetchRequest::post(primary.url_for(path, &BTreeMap::new())?).json(body)?;
        let idempotency =
            idempotency_key.map(|k| IdempotencyKey::new(k).with_ttl(self.idempotency_ttl));
        self.resolver
            .http()
            .typed_fetch(request, &self.policy, idempotency.as_ref())
            .await
    }

    /// Force matching cache entries stale; returns the number removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern)
    }
}

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::{ContentCache, ContentKind, Fingerprint};
use crate::http::{FetchError, FetchRequest, HttpClient};
use crate::idempotency::IdempotencyKey;
use crate::retry::RetryPolicy;

use super::presence::Presence;
use super::source::SourceCandidate;
use super::{LookupResult, SourceTier};

/// Placeholder in [`ResolveOptions::path`] replaced by the entity key.
const KEY_PLACEHOLDER: &str = "{key}";

/// How to look an entity up on each candidate.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Path joined onto each origin; `{key}` is replaced by the percent-encoded entity key.
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub policy: RetryPolicy,
    /// Per-attempt timeout; client default when `None`.
    pub timeout: Option<Duration>,
    /// Reuse successful answers per origin for this long (idempotency key `fingerprint@origin`).
    pub idempotency_ttl: Option<Duration>,
    /// Read and fill the content cache under this classification.
    pub cache: Option<ContentKind>,
}

impl ResolveOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: BTreeMap::new(),
            policy: RetryPolicy::default(),
            timeout: None,
            idempotency_ttl: None,
            cache: None,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn idempotency_ttl(mut self, ttl: Duration) -> Self {
        self.idempotency_ttl = Some(ttl);
        self
    }

    pub fn cached_as(mut self, kind: ContentKind) -> Self {
        self.cache = Some(kind);
        self
    }

    /// Cache key for `entity_key`; independent of which origin answers.
    pub fn fingerprint(&self, entity_key: &str) -> Fingerprint {
        Fingerprint::new(self.path.replace(KEY_PLACEHOLDER, entity_key)).params(
            self.query
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }

    fn request_path(&self, entity_key: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(entity_key.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        self.path.replace(KEY_PLACEHOLDER, &encoded)
    }
}

/// Tries candidate origins in order through the HTTP wrapper.
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    http: HttpClient,
    cache: Option<ContentCache>,
}

impl FallbackResolver {
    pub fn new(http: HttpClient) -> Self {
        Self { http, cache: None }
    }

    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Resolve `entity_key` across `candidates` (first = primary).
    ///
    /// Never fails: a candidate error or empty answer is logged and the next
    /// candidate is tried; exhaustion returns `entity: None` with `source`
    /// set to the last tier attempted.
    pub async fn resolve<T>(
        &self,
        entity_key: &str,
        candidates: &[SourceCandidate],
        options: &ResolveOptions,
    ) -> LookupResult<T>
    where
        T: DeserializeOwned + Serialize + Presence + Clone + Send + Sync + 'static,
    {
        let started = Instant::now();
        let fingerprint = options.fingerprint(entity_key).as_key();

        if let (Some(cache), Some(_)) = (&self.cache, options.cache) {
            if let Some(entity) = cache.get_as::<T>(&fingerprint) {
                tracing::debug!(fingerprint = %fingerprint, "served from cache");
                return LookupResult {
                    entity: Some(entity),
                    source: SourceTier::Cache,
                    fallback_used: false,
                    elapsed: started.elapsed(),
                    origin: None,
                };
            }
        }

        let mut last_tier = SourceTier::Primary;
        for (index, candidate) in candidates.iter().enumerate() {
            let tier = if index == 0 {
                SourceTier::Primary
            } else {
                SourceTier::Fallback
            };
            last_tier = tier;

            match self
                .fetch_from::<T>(candidate, entity_key, &fingerprint, options)
                .await
            {
                Ok(entity) if entity.is_present() => {
                    if tier == SourceTier::Fallback {
                        tracing::info!(
                            key = entity_key,
                            origin = %candidate.origin,
                            "resolved from fallback source"
                        );
                    }
                    self.fill_cache(&fingerprint, &entity, options.cache);
                    return LookupResult {
                        entity: Some(entity),
                        source: tier,
                        fallback_used: index > 0,
                        elapsed: started.elapsed(),
                        origin: Some(candidate.origin.clone()),
                    };
                }
                Ok(_) => {
                    tracing::warn!(
                        key = entity_key,
                        origin = %candidate.origin,
                        "source returned no content, trying next"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        key = entity_key,
                        origin = %candidate.origin,
                        "source failed, trying next: {}",
                        e
                    );
                }
            }
        }

        LookupResult {
            entity: None,
            source: last_tier,
            fallback_used: last_tier == SourceTier::Fallback,
            elapsed: started.elapsed(),
            origin: None,
        }
    }

    async fn fetch_from<T>(
        &self,
        candidate: &SourceCandidate,
        entity_key: &str,
        fingerprint: &str,
        options: &ResolveOptions,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let url = candidate.url_for(&options.request_path(entity_key), &options.query)?;
        let mut request = FetchRequest::get(url);
        request.timeout = options.timeout;
        let idempotency = options
            .idempotency_ttl
            .map(|ttl| IdempotencyKey::new(format!("{fingerprint}@{}", candidate.origin)).with_ttl(ttl));
        self.http
            .typed_fetch(request, &options.policy, idempotency.as_ref())
            .await
    }

    fn fill_cache<T: Serialize>(&self, fingerprint: &str, entity: &T, kind: Option<ContentKind>) {
        let (Some(cache), Some(kind)) = (&self.cache, kind) else {
            return;
        };
        match serde_json::to_value(entity) {
            Ok(payload) => {
                cache.set(fingerprint, payload, kind);
            }
            Err(e) => tracing::warn!(fingerprint, "entity not cacheable: {}", e),
        }
    }
}

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tokio::time::Instant;

use crate::sync::lock;

use super::kind::{ContentKind, TtlTable};

struct CacheEntry {
    payload: Value,
    expiry: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now <= self.expiry
    }
}

struct Inner {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttls: TtlTable,
}

/// Shared handle to the content cache. Clones share the same entries.
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentCache")
            .field("entries", &self.len())
            .field("ttls", &self.inner.ttls)
            .finish()
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(TtlTable::default())
    }
}

impl ContentCache {
    pub fn new(ttls: TtlTable) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                ttls,
            }),
        }
    }

    /// Store `payload` under `fingerprint` for the lifetime of `kind`.
    ///
    /// Zero-lifetime kinds are never stored; returns whether an entry was written.
    pub fn set(&self, fingerprint: impl Into<String>, payload: Value, kind: ContentKind) -> bool {
        let ttl = self.inner.ttls.ttl(kind);
        if ttl.is_zero() {
            return false;
        }
        let fingerprint = fingerprint.into();
        let expiry = Instant::now() + ttl;
        lock(&self.inner.entries).insert(fingerprint.clone(), CacheEntry { payload, expiry });
        tracing::debug!(fingerprint = %fingerprint, kind = %kind, ttl_secs = ttl.as_secs(), "cached");
        schedule_cleanup(Arc::downgrade(&self.inner), fingerprint, expiry);
        true
    }

    /// Payload for `fingerprint` while it has not expired. Expired entries are evicted here.
    pub fn get(&self, fingerprint: &str) -> Option<Value> {
        let mut entries = lock(&self.inner.entries);
        let entry = entries.get(fingerprint)?;
        if entry.is_live(Instant::now()) {
            return Some(entry.payload.clone());
        }
        entries.remove(fingerprint);
        tracing::debug!(fingerprint, "cache entry expired, evicted");
        None
    }

    /// Typed read; a payload that no longer matches `T` counts as a miss.
    pub fn get_as<T: DeserializeOwned>(&self, fingerprint: &str) -> Option<T> {
        serde_json::from_value(self.get(fingerprint)?).ok()
    }

    /// Remove every entry whose fingerprint contains `pattern`; returns the count removed.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut entries = lock(&self.inner.entries);
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(pattern, removed, "cache invalidated");
        }
        removed
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = lock(&self.inner.entries);
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        lock(&self.inner.entries).clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evict the entry once `expiry` passes unless it was replaced in the meantime.
fn schedule_cleanup(inner: Weak<Inner>, fingerprint: String, expiry: Instant) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };
    handle.spawn(async move {
        tokio::time::sleep_until(expiry).await;
        if let Some(inner) = inner.upgrade() {
            let mut entries = lock(&inner.entries);
            if entries.get(&fingerprint).is_some_and(|e| e.expiry == expiry) {
                entries.remove(&fingerprint);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn breaking_is_never_cached() {
        let cache = ContentCache::default();
        assert!(!cache.set("/api/breaking", json!([{"id": 1}]), ContentKind::Breaking));
        assert_eq!(cache.get("/api/breaking"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hot_lives_five_seconds() {
        let cache = ContentCache::default();
        cache.set("/api/hot", json!({"items": [1, 2]}), ContentKind::Hot);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("/api/hot"), Some(json!({"items": [1, 2]})));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("/api/hot"), None);
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        // No runtime here, so no deferred cleanup: only the read can evict.
        let mut ttls = TtlTable::default();
        ttls.trending = Duration::from_millis(1);
        let cache = ContentCache::new(ttls);
        cache.set("/api/topics", json!(["a"]), ContentKind::Trending);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/api/topics"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_cleanup_removes_entry() {
        let cache = ContentCache::default();
        cache.set("/api/recommend", json!([1]), ContentKind::Recommend);
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_entry_survives_old_cleanup() {
        let cache = ContentCache::default();
        cache.set("/api/articles/a", json!(1), ContentKind::Hot);
        tokio::time::advance(Duration::from_secs(3)).await;
        cache.set("/api/articles/a", json!(2), ContentKind::Hot);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(cache.get("/api/articles/a"), Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_by_substring() {
        let cache = ContentCache::default();
        cache.set("/api/news?page=1", json!(1), ContentKind::Normal);
        cache.set("/api/news?page=2", json!(2), ContentKind::Normal);
        cache.set("/api/channels/news-desk", json!(3), ContentKind::Recommend);
        cache.set("/api/topics", json!(4), ContentKind::Normal);

        assert_eq!(cache.invalidate("news"), 3);
        assert_eq!(cache.get("/api/news?page=1"), None);
        assert_eq!(cache.get("/api/topics"), Some(json!(4)));
        assert_eq!(cache.invalidate("news"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn typed_read() {
        let cache = ContentCache::default();
        cache.set("/api/channels", json!(["tech", "sports"]), ContentKind::Normal);
        let channels: Vec<String> = cache.get_as("/api/channels").unwrap();
        assert_eq!(channels, vec!["tech", "sports"]);
        assert_eq!(cache.get_as::<u64>("/api/channels"), None);
    }

    #[test]
    fn purge_without_runtime() {
        let mut ttls = TtlTable::default();
        ttls.hot = Duration::from_nanos(1);
        let cache = ContentCache::new(ttls);
        cache.set("/api/hot", json!(1), ContentKind::Hot);
        cache.set("/api/topics", json!(2), ContentKind::Normal);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}

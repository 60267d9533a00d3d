use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::Instant;

use crate::retry::{execute_with_retry, Classify, RetryPolicy};
use crate::sync::lock;

use super::entry::{IdempotencyEntry, IdempotencyKey};

type KeyLock = Arc<tokio::sync::Mutex<()>>;

/// Async lock for one key plus the number of calls holding or waiting on it.
struct KeySlot {
    lock: KeyLock,
    users: usize,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, IdempotencyEntry>>,
    /// One slot per key with a call in progress; serializes check, run and store.
    in_flight: Mutex<HashMap<String, KeySlot>>,
}

/// Gives up a call's claim on its key slot when dropped, including when the
/// call's future is cancelled mid-operation.
struct KeyLockRelease<'a> {
    store: &'a IdempotencyStore,
    key: &'a str,
}

impl Drop for KeyLockRelease<'_> {
    fn drop(&mut self) {
        self.store.release_key_lock(self.key);
    }
}

/// Shared handle to the idempotency store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct IdempotencyStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for IdempotencyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdempotencyStore")
            .field("entries", &self.len())
            .finish()
    }
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` under the retry policy, reusing a stored result for the key.
    ///
    /// Without a key this is plain [`execute_with_retry`]. With a key, a fresh
    /// stored result is returned without running the operation; otherwise the
    /// operation runs and a success is stored for `ttl`. Concurrent calls with
    /// the same key wait for each other, so the later ones reuse the first
    /// success instead of repeating the operation.
    pub async fn execute_with_idempotency<T, E, F, Fut>(
        &self,
        policy: &RetryPolicy,
        idempotency: Option<&IdempotencyKey>,
        operation: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Classify + std::error::Error,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(idem) = idempotency else {
            return execute_with_retry(policy, operation).await;
        };

        let key_lock = self.acquire_key_lock(&idem.key);
        let _release = KeyLockRelease {
            store: self,
            key: &idem.key,
        };
        let _guard = key_lock.lock().await;
        if let Some(hit) = self.lookup::<T>(&idem.key) {
            tracing::debug!(key = %idem.key, "idempotency hit, reusing stored result");
            return Ok(hit);
        }
        let result = execute_with_retry(policy, operation).await;
        if let Ok(value) = &result {
            self.store(&idem.key, value.clone(), idem.ttl);
        }
        result
    }

    /// Fresh stored result for `key`, if any. Expired entries are evicted here.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.lookup(key)
    }

    /// Whether a fresh entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        let entries = lock(&self.inner.entries);
        entries
            .get(key)
            .is_some_and(|e| e.is_fresh(Instant::now()))
    }

    /// Drop the entry for `key`; the next call with it runs the operation again.
    pub fn forget(&self, key: &str) -> bool {
        lock(&self.inner.entries).remove(key).is_some()
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = lock(&self.inner.entries);
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let mut entries = lock(&self.inner.entries);
        let entry = entries.get(key)?;
        if !entry.is_fresh(Instant::now()) {
            entries.remove(key);
            tracing::debug!(key, "idempotency entry expired, evicted");
            return None;
        }
        // A key reused for a different result type is treated as a miss.
        entry.result.downcast_ref::<T>().cloned()
    }

    fn store<T: Send + Sync + 'static>(&self, key: &str, value: T, ttl: Duration) {
        let stored_at = Instant::now();
        lock(&self.inner.entries).insert(
            key.to_string(),
            IdempotencyEntry {
                result: Arc::new(value),
                stored_at,
                ttl,
            },
        );
        schedule_cleanup(Arc::downgrade(&self.inner), key.to_string(), stored_at, ttl);
    }

    fn acquire_key_lock(&self, key: &str) -> KeyLock {
        let mut in_flight = lock(&self.inner.in_flight);
        let slot = in_flight.entry(key.to_string()).or_insert_with(|| KeySlot {
            lock: KeyLock::default(),
            users: 0,
        });
        slot.users += 1;
        Arc::clone(&slot.lock)
    }

    fn release_key_lock(&self, key: &str) {
        let mut in_flight = lock(&self.inner.in_flight);
        if let Some(slot) = in_flight.get_mut(key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                in_flight.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        lock(&self.inner.in_flight).len()
    }
}

/// Remove the entry at `stored_at + ttl` unless it was replaced in the meantime.
/// Without a tokio runtime, eviction happens lazily on read or via `purge_expired`.
fn schedule_cleanup(inner: Weak<Inner>, key: String, stored_at: Instant, ttl: Duration) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };
    handle.spawn(async move {
        tokio::time::sleep_until(stored_at + ttl).await;
        if let Some(inner) = inner.upgrade() {
            let mut entries = lock(&inner.entries);
            if entries.get(&key).is_some_and(|e| e.stored_at == stored_at) {
                entries.remove(&key);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::testing::FakeError;
    use crate::retry::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_op(
        calls: &Arc<AtomicU32>,
        value: &'static str,
    ) -> impl FnMut() -> std::future::Ready<Result<String, FakeError>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value.to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn same_key_within_ttl_runs_once() {
        let store = IdempotencyStore::new();
        let key = IdempotencyKey::new("comment-42").with_ttl(Duration::from_secs(60));
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let first = store
            .execute_with_idempotency(&policy, Some(&key), counting_op(&calls, "v1"))
            .await;
        let second = store
            .execute_with_idempotency(&policy, Some(&key), counting_op(&calls, "v2"))
            .await;

        assert_eq!(first.unwrap(), "v1");
        assert_eq!(second.unwrap(), "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_key_runs_again() {
        let store = IdempotencyStore::new();
        let key = IdempotencyKey::new("like-7").with_ttl(Duration::from_secs(10));
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        store
            .execute_with_idempotency(&policy, Some(&key), counting_op(&calls, "v1"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        let again = store
            .execute_with_idempotency(&policy, Some(&key), counting_op(&calls, "v2"))
            .await
            .unwrap();

        assert_eq!(again, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_key_never_deduplicates() {
        let store = IdempotencyStore::new();
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        for _ in 0..3 {
            store
                .execute_with_idempotency(&policy, None, counting_op(&calls, "v"))
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_not_stored() {
        let store = IdempotencyStore::new();
        let key = IdempotencyKey::new("post-1");
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let failed: Result<String, FakeError> = store
            .execute_with_idempotency(&policy, Some(&key), || {
                calls.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(FakeError(ErrorKind::Http4xx(400))))
            })
            .await;
        assert!(failed.is_err());
        assert!(!store.contains("post-1"));

        let ok = store
            .execute_with_idempotency(&policy, Some(&key), counting_op(&calls, "ok"))
            .await;
        assert_eq!(ok.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_run() {
        let store = IdempotencyStore::new();
        let key = IdempotencyKey::new("vote-9");
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let slow_op = |label: &'static str| {
            let calls = Arc::clone(&calls);
            move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, FakeError>(label.to_string())
                }
            }
        };

        let (a, b) = tokio::join!(
            store.execute_with_idempotency(&policy, Some(&key), slow_op("a")),
            store.execute_with_idempotency(&policy, Some(&key), slow_op("b")),
        );
        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.in_flight_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_calls_release_their_key_slots() {
        let store = IdempotencyStore::new();
        let policy = RetryPolicy::default();
        for i in 0..100 {
            let key = IdempotencyKey::new(format!("comment-{i}"));
            let call = store.execute_with_idempotency(&policy, Some(&key), || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, FakeError>("posted".to_string())
            });
            let outcome = tokio::time::timeout(Duration::from_millis(10), call).await;
            assert!(outcome.is_err());
        }
        assert_eq!(store.in_flight_len(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_waiter_leaves_holder_and_slot_intact() {
        let store = IdempotencyStore::new();
        let key = IdempotencyKey::new("vote-10");
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let holder = store.execute_with_idempotency(&policy, Some(&key), {
            let calls = Arc::clone(&calls);
            move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, FakeError>("held".to_string())
                }
            }
        });
        let waiter = tokio::time::timeout(
            Duration::from_millis(50),
            store.execute_with_idempotency(&policy, Some(&key), counting_op(&calls, "waited")),
        );
        let (held, waited) = tokio::join!(holder, waiter);

        assert_eq!(held.unwrap(), "held");
        assert!(waited.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.in_flight_len(), 0);
        assert_eq!(store.get::<String>("vote-10").as_deref(), Some("held"));
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_cleanup_evicts_after_ttl() {
        let store = IdempotencyStore::new();
        let key = IdempotencyKey::new("share-3").with_ttl(Duration::from_secs(5));
        let calls = Arc::new(AtomicU32::new(0));
        store
            .execute_with_idempotency(&RetryPolicy::default(), Some(&key), counting_op(&calls, "v"))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn type_mismatch_is_a_miss() {
        let store = IdempotencyStore::new();
        let key = IdempotencyKey::new("k");
        let calls = Arc::new(AtomicU32::new(0));
        store
            .execute_with_idempotency(&RetryPolicy::default(), Some(&key), counting_op(&calls, "s"))
            .await
            .unwrap();
        assert_eq!(store.get::<String>("k").as_deref(), Some("s"));
        assert_eq!(store.get::<u64>("k"), None);
    }

    #[test]
    fn purge_expired_without_runtime() {
        let store = IdempotencyStore::new();
        store.store("old", 1u32, Duration::ZERO);
        store.store("new", 2u32, Duration::from_secs(60));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.get::<u32>("new"), Some(2));
        assert!(store.forget("new"));
        assert!(store.is_empty());
    }
}

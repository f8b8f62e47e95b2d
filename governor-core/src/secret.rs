//! Lazy-refreshing typed secret accessor with an invalidation hook.
//!
//! Mirrors the staleness/refresh-lock dance `governor-security`'s JWKS cache
//! uses for remote keys, generalized to any named secret blob a resource
//! client needs (DB credentials, object store keys, token signing material).

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::error::GovernorError;

/// Contract exposed to every resource client. `GetSecret` returns a decoded
/// secret blob fresh within `max_age`; after `InvalidateSecret`, the next
/// call MUST refetch. Safe for parallel callers.
pub trait SecretReader<T>: Send + Sync {
    fn get_secret(
        &self,
        name: &str,
        max_age: Duration,
    ) -> impl Future<Output = Result<Arc<T>, GovernorError>> + Send;

    fn invalidate_secret(&self, name: &str) -> impl Future<Output = ()> + Send;
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
}

/// A fetch-on-demand, TTL-cached [`SecretReader`] backed by a user-supplied
/// fetch closure. One cache entry per secret name; refresh is serialized per
/// name so concurrent callers don't stampede the backing store.
pub struct InMemorySecretReader<T, F> {
    entries: RwLock<HashMap<String, Entry>>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    fetch: F,
    _marker: std::marker::PhantomData<T>,
}

impl<T, F, Fut> InMemorySecretReader<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, GovernorError>> + Send,
{
    pub fn new(fetch: F) -> Self {
        InMemorySecretReader {
            entries: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
            fetch,
            _marker: std::marker::PhantomData,
        }
    }

    async fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl<T, F, Fut> SecretReader<T> for InMemorySecretReader<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, GovernorError>> + Send,
{
    async fn get_secret(&self, name: &str, max_age: Duration) -> Result<Arc<T>, GovernorError> {
        if let Some(entry) = self.entries.read().await.get(name) {
            if entry.fetched_at.elapsed() < max_age {
                return Ok(Arc::clone(&entry.value)
                    .downcast::<T>()
                    .map_err(|_| GovernorError::client("secret type mismatch"))?);
            }
        }

        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;

        // Re-check: another caller may have refreshed while we waited.
        if let Some(entry) = self.entries.read().await.get(name) {
            if entry.fetched_at.elapsed() < max_age {
                return Ok(Arc::clone(&entry.value)
                    .downcast::<T>()
                    .map_err(|_| GovernorError::client("secret type mismatch"))?);
            }
        }

        let value: Arc<dyn Any + Send + Sync> = Arc::new((self.fetch)(name.to_string()).await?);
        let typed = Arc::clone(&value)
            .downcast::<T>()
            .map_err(|_| GovernorError::client("secret type mismatch"))?;
        self.entries.write().await.insert(
            name.to_string(),
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
        Ok(typed)
    }

    async fn invalidate_secret(&self, name: &str) {
        self.entries.write().await.remove(name);
    }
}

/// Test double that always returns a fixed value and never refetches.
pub struct StaticSecretReader<T>(Arc<T>);

impl<T: Send + Sync + 'static> StaticSecretReader<T> {
    pub fn new(value: T) -> Self {
        StaticSecretReader(Arc::new(value))
    }
}

impl<T: Send + Sync + 'static> SecretReader<T> for StaticSecretReader<T> {
    async fn get_secret(&self, _name: &str, _max_age: Duration) -> Result<Arc<T>, GovernorError> {
        Ok(Arc::clone(&self.0))
    }

    async fn invalidate_secret(&self, _name: &str) {}
}

/// Returns `true` when a value last refreshed at `last_refresh` is older
/// than `ttl` and should be refetched.
pub fn is_stale(last_refresh: Instant, ttl: Duration) -> bool {
    last_refresh.elapsed() >= ttl
}

/// Returns `true` when enough time has passed since `last_attempt` to allow
/// another refresh attempt, preventing refresh storms on a failing backend.
pub fn can_attempt(last_attempt: Instant, min_interval: Duration) -> bool {
    last_attempt.elapsed() >= min_interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn caches_within_max_age_and_refetches_after() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let reader = InMemorySecretReader::new(move |_name: String| {
            let calls = Arc::clone(&calls2);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(format!("secret-{}", calls.load(Ordering::SeqCst)))
            }
        });

        let a = reader.get_secret("db", Duration::from_millis(50)).await.unwrap();
        let b = reader.get_secret("db", Duration::from_millis(50)).await.unwrap();
        assert_eq!(*a, *b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let c = reader.get_secret("db", Duration::from_millis(50)).await.unwrap();
        assert_ne!(*a, *c);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let reader = InMemorySecretReader::new(move |_: String| {
            let calls = Arc::clone(&calls2);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(calls.load(Ordering::SeqCst))
            }
        });
        let a = reader.get_secret("k", Duration::from_secs(60)).await.unwrap();
        reader.invalidate_secret("k").await;
        let b = reader.get_secret("k", Duration::from_secs(60)).await.unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn stale_and_attempt_thresholds() {
        let now = Instant::now();
        assert!(!is_stale(now, Duration::from_secs(60)));
        assert!(can_attempt(now - Duration::from_secs(10), Duration::from_secs(5)));
        assert!(!can_attempt(now, Duration::from_secs(5)));
    }
}

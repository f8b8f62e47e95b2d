//! Generic resource lifecycle: construct, cache, ping, stop.
//!
//! Every external-resource client in Governor (SQL pool, NATS connection,
//! object store client, token signer) is wrapped in a [`Lifecycle<T>`]. It
//! holds at most one live value, serializes construction so two builds never
//! race, and runs a heartbeat loop that re-validates the cached value on an
//! interval, invalidating it on repeated failure.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::GovernorError;

/// User-supplied builder: inspect the previous value (if any) and either
/// reuse it or build and return a new one.
pub trait Builder<T>: Send + Sync {
    fn build(
        &self,
        previous: Option<Arc<T>>,
    ) -> impl Future<Output = Result<Arc<T>, GovernorError>> + Send;
}

impl<T, F, Fut> Builder<T> for F
where
    F: Fn(Option<Arc<T>>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Arc<T>, GovernorError>> + Send,
{
    fn build(
        &self,
        previous: Option<Arc<T>>,
    ) -> impl Future<Output = Result<Arc<T>, GovernorError>> + Send {
        self(previous)
    }
}

/// User-supplied liveness probe, run once per heartbeat tick against the
/// currently constructed value.
pub trait Pinger<T>: Send + Sync {
    fn ping(&self, value: &T) -> impl Future<Output = Result<(), GovernorError>> + Send;
}

impl<T, F, Fut> Pinger<T> for F
where
    F: Fn(&T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), GovernorError>> + Send,
{
    fn ping(&self, value: &T) -> impl Future<Output = Result<(), GovernorError>> + Send {
        self(value)
    }
}

struct Inner<T> {
    current: RwLock<Option<Arc<T>>>,
    build_lock: Mutex<()>,
    fail_count: AtomicU32,
    stopped: AtomicU32,
}

/// Holds at most one live client of type `T`, serializes construction and
/// drives the heartbeat loop.
///
/// Invariants: any value stored has been successfully constructed; after
/// [`Lifecycle::stop`], no further [`Lifecycle::load`] returns the stopped
/// value; construction is serialized (never two concurrent builds).
pub struct Lifecycle<T> {
    inner: Arc<Inner<T>>,
    name: String,
}

impl<T> Clone for Lifecycle<T> {
    fn clone(&self) -> Self {
        Lifecycle {
            inner: Arc::clone(&self.inner),
            name: self.name.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Lifecycle<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Lifecycle {
            inner: Arc::new(Inner {
                current: RwLock::new(None),
                build_lock: Mutex::new(()),
                fail_count: AtomicU32::new(0),
                stopped: AtomicU32::new(0),
            }),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the currently cached value without blocking on construction.
    pub async fn load(&self) -> Option<Arc<T>> {
        self.inner.current.read().await.clone()
    }

    /// Serialized acquisition of a fresh value. If a build is already in
    /// flight, waits for it rather than racing a second construction.
    pub async fn construct<B: Builder<T>>(&self, builder: &B) -> Result<Arc<T>, GovernorError> {
        let _guard = self.inner.build_lock.lock().await;
        if self.inner.stopped.load(Ordering::Acquire) != 0 {
            return Err(GovernorError::client(format!(
                "lifecycle '{}' is stopped",
                self.name
            )));
        }
        let previous = self.inner.current.read().await.clone();
        let value = builder.build(previous).await?;
        *self.inner.current.write().await = Some(Arc::clone(&value));
        self.inner.fail_count.store(0, Ordering::Release);
        Ok(value)
    }

    /// Force-release of any cached value. Idempotent.
    pub async fn stop(&self) {
        self.inner.stopped.store(1, Ordering::Release);
        *self.inner.current.write().await = None;
    }

    fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire) != 0
    }

    /// Long-running heartbeat loop: on each tick, constructs (or reuses) the
    /// value and runs `pinger` against it. After `max_fail` consecutive
    /// failures, `on_fail_threshold` is invoked (typically to invalidate a
    /// cached secret) and the fail counter resets so the caller gets a clean
    /// run at the new credentials.
    pub async fn heartbeat<B, P, F>(
        &self,
        interval: Duration,
        max_fail: u32,
        builder: B,
        pinger: P,
        on_fail_threshold: F,
        cancel: CancellationToken,
    ) where
        B: Builder<T>,
        P: Pinger<T>,
        F: Fn() + Send,
    {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(lifecycle = %self.name, "heartbeat cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    if self.is_stopped() {
                        return;
                    }
                    match self.construct(&builder).await {
                        Ok(value) => match pinger.ping(&value).await {
                            Ok(()) => {
                                self.inner.fail_count.store(0, Ordering::Release);
                            }
                            Err(err) => {
                                let count = self.inner.fail_count.fetch_add(1, Ordering::AcqRel) + 1;
                                tracing::warn!(lifecycle = %self.name, %err, fail_count = count, "ping failed");
                                if count >= max_fail {
                                    tracing::error!(lifecycle = %self.name, "fail threshold reached, invalidating");
                                    on_fail_threshold();
                                    self.inner.fail_count.store(0, Ordering::Release);
                                }
                            }
                        },
                        Err(err) => {
                            let count = self.inner.fail_count.fetch_add(1, Ordering::AcqRel) + 1;
                            tracing::warn!(lifecycle = %self.name, %err, fail_count = count, "construct failed");
                            if count >= max_fail {
                                on_fail_threshold();
                                self.inner.fail_count.store(0, Ordering::Release);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32 as AU32;

    #[tokio::test]
    async fn construct_publishes_value_visible_to_load() {
        let lc: Lifecycle<u32> = Lifecycle::new("test");
        assert!(lc.load().await.is_none());
        let v = lc
            .construct(&|_prev: Option<Arc<u32>>| async { Ok(Arc::new(42)) })
            .await
            .unwrap();
        assert_eq!(*v, 42);
        assert_eq!(*lc.load().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn stop_clears_cached_value_and_rejects_construct() {
        let lc: Lifecycle<u32> = Lifecycle::new("test");
        lc.construct(&|_: Option<Arc<u32>>| async { Ok(Arc::new(1)) })
            .await
            .unwrap();
        lc.stop().await;
        assert!(lc.load().await.is_none());
        let err = lc
            .construct(&|_: Option<Arc<u32>>| async { Ok(Arc::new(2)) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Client);
    }

    #[tokio::test]
    async fn concurrent_constructs_never_overlap() {
        let lc: Lifecycle<u32> = Lifecycle::new("test");
        let in_flight = Arc::new(AU32::new(0));
        let max_seen = Arc::new(AU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lc = lc.clone();
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                lc.construct(&move |_: Option<Arc<u32>>| {
                    let in_flight = Arc::clone(&in_flight);
                    let max_seen = Arc::clone(&max_seen);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(Arc::new(0))
                    }
                })
                .await
                .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn heartbeat_invokes_fail_threshold_after_max_fail() {
        let lc: Lifecycle<u32> = Lifecycle::new("test");
        let cancel = CancellationToken::new();
        let tripped = Arc::new(AU32::new(0));
        let tripped2 = Arc::clone(&tripped);
        let cancel2 = cancel.clone();

        let handle = tokio::spawn(async move {
            lc.heartbeat(
                Duration::from_millis(5),
                2,
                |_: Option<Arc<u32>>| async { Ok(Arc::new(0)) },
                |_: &u32| async { Err(GovernorError::connection("down")) },
                move || {
                    tripped2.store(1, Ordering::SeqCst);
                    cancel2.cancel();
                },
                cancel,
            )
            .await;
        });
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tripped.load(Ordering::SeqCst), 1);
    }
}

//! Health indicator aggregation shared by [`crate::kernel::Kernel`] and
//! individual services that want to compose several checks into one.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;

/// Result of a single health check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down(String),
}

impl HealthStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }
}

/// A named health indicator that can be registered with a [`HealthState`].
pub trait HealthIndicator: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn check(&self) -> impl std::future::Future<Output = HealthStatus> + Send;

    /// Whether this check affects readiness (default `true`). Liveness-only
    /// checks return `false` so they don't block readiness.
    fn affects_readiness(&self) -> bool {
        true
    }
}

/// A single check result in an aggregated report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duration_ms: u64,
}

/// Aggregated health report across all registered indicators.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub up: bool,
    pub checks: Vec<HealthCheck>,
    pub uptime_seconds: u64,
}

trait ErasedIndicator: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = HealthStatus> + Send + '_>>;
    fn affects_readiness(&self) -> bool;
}

impl<T: HealthIndicator> ErasedIndicator for T {
    fn name(&self) -> &str {
        HealthIndicator::name(self)
    }
    fn check(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = HealthStatus> + Send + '_>> {
        Box::pin(HealthIndicator::check(self))
    }
    fn affects_readiness(&self) -> bool {
        HealthIndicator::affects_readiness(self)
    }
}

/// Aggregates a set of [`HealthIndicator`]s, with an optional TTL cache so a
/// high-frequency health poller doesn't re-run expensive checks on every
/// call.
pub struct HealthState {
    checks: Vec<Box<dyn ErasedIndicator>>,
    start_time: Instant,
    cache_ttl: Option<Duration>,
    cache: RwLock<Option<(HealthReport, Instant)>>,
}

impl HealthState {
    pub fn new(cache_ttl: Option<Duration>) -> Self {
        HealthState {
            checks: Vec::new(),
            start_time: Instant::now(),
            cache_ttl,
            cache: RwLock::new(None),
        }
    }

    pub fn register<H: HealthIndicator>(&mut self, indicator: H) {
        self.checks.push(Box::new(indicator));
    }

    pub async fn aggregate(&self) -> HealthReport {
        self.aggregate_filtered(|_| true).await
    }

    pub async fn aggregate_readiness(&self) -> HealthReport {
        self.aggregate_filtered(|c| c.affects_readiness()).await
    }

    async fn aggregate_filtered(&self, include: impl Fn(&dyn ErasedIndicator) -> bool) -> HealthReport {
        if let Some(ttl) = self.cache_ttl {
            let cache = self.cache.read().await;
            if let Some((ref report, ref ts)) = *cache {
                if ts.elapsed() < ttl {
                    return report.clone();
                }
            }
        }

        let mut checks = Vec::new();
        let mut all_up = true;
        for indicator in &self.checks {
            if !include(indicator.as_ref()) {
                continue;
            }
            let start = Instant::now();
            let status = indicator.check().await;
            let duration_ms = start.elapsed().as_millis() as u64;
            let (up, reason) = match status {
                HealthStatus::Up => (true, None),
                HealthStatus::Down(reason) => {
                    all_up = false;
                    (false, Some(reason))
                }
            };
            checks.push(HealthCheck {
                name: indicator.name().to_string(),
                up,
                reason,
                duration_ms,
            });
        }

        let report = HealthReport {
            up: all_up,
            checks,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        };

        if self.cache_ttl.is_some() {
            *self.cache.write().await = Some((report.clone(), Instant::now()));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(HealthStatus);
    impl HealthIndicator for Always {
        fn name(&self) -> &str {
            "always"
        }
        fn check(&self) -> impl std::future::Future<Output = HealthStatus> + Send {
            let s = self.0.clone();
            async move { s }
        }
    }

    #[tokio::test]
    async fn aggregate_is_down_if_any_check_is_down() {
        let mut state = HealthState::new(None);
        state.register(Always(HealthStatus::Up));
        state.register(Always(HealthStatus::Down("oops".into())));
        let report = state.aggregate().await;
        assert!(!report.up);
        assert_eq!(report.checks.len(), 2);
    }

    #[tokio::test]
    async fn cache_ttl_reuses_result_within_window() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        struct Counting(Arc<AtomicU32>);
        impl HealthIndicator for Counting {
            fn name(&self) -> &str {
                "counting"
            }
            fn check(&self) -> impl std::future::Future<Output = HealthStatus> + Send {
                let counter = Arc::clone(&self.0);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    HealthStatus::Up
                }
            }
        }

        let counter = Arc::new(AtomicU32::new(0));
        let mut state = HealthState::new(Some(Duration::from_millis(50)));
        state.register(Counting(Arc::clone(&counter)));

        state.aggregate().await;
        state.aggregate().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        state.aggregate().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}

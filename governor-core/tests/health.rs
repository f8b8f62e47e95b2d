use std::time::Duration;

use governor_core::health::{HealthIndicator, HealthState, HealthStatus};

#[test]
fn health_status_is_up() {
    assert!(HealthStatus::Up.is_up());
}

#[test]
fn health_status_down_is_not_up() {
    assert!(!HealthStatus::Down("db unreachable".into()).is_up());
}

struct AlwaysUp;
impl HealthIndicator for AlwaysUp {
    fn name(&self) -> &str {
        "up-check"
    }
    fn check(&self) -> impl std::future::Future<Output = HealthStatus> + Send {
        async { HealthStatus::Up }
    }
}

struct AlwaysDown;
impl HealthIndicator for AlwaysDown {
    fn name(&self) -> &str {
        "down-check"
    }
    fn check(&self) -> impl std::future::Future<Output = HealthStatus> + Send {
        async { HealthStatus::Down("broken".into()) }
    }
    fn affects_readiness(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn aggregate_is_down_when_any_check_fails() {
    let mut state = HealthState::new(None);
    state.register(AlwaysUp);
    state.register(AlwaysDown);
    let report = state.aggregate().await;
    assert!(!report.up);
    assert_eq!(report.checks.len(), 2);
    assert!(report.checks[0].up);
    assert!(!report.checks[1].up);
    assert_eq!(report.checks[1].reason.as_deref(), Some("broken"));
}

#[tokio::test]
async fn readiness_excludes_liveness_only_checks() {
    let mut state = HealthState::new(None);
    state.register(AlwaysUp);
    state.register(AlwaysDown);
    let report = state.aggregate_readiness().await;
    assert!(report.up);
    assert_eq!(report.checks.len(), 1);
    assert_eq!(report.checks[0].name, "up-check");
}

#[tokio::test]
async fn cache_ttl_reuses_previous_report() {
    let mut state = HealthState::new(Some(Duration::from_secs(60)));
    state.register(AlwaysUp);
    let r1 = state.aggregate().await;
    let r2 = state.aggregate().await;
    assert!(r1.up && r2.up);
}

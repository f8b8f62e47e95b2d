//! Service Kernel: registers services, orders `Init`/`Start`/`Stop`/`Health`
//! by declared dependency, and aggregates health into a name-keyed map.
//!
//! Grounded on the aggregation shape of [`crate::health::HealthState`],
//! generalized from "a flat list of health indicators" to "a dependency-
//! ordered list of already-initialized services".

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, ConfigProperties, GovernorConfig};
use crate::error::GovernorError;
use crate::health::{HealthCheck, HealthReport, HealthStatus};

/// Handed to [`Service::register`] so each service can declare its config
/// section's metadata in the global registry before any service is
/// initialized.
pub struct ConfigRegistrar {
    _private: (),
}

impl ConfigRegistrar {
    fn new() -> Self {
        ConfigRegistrar { _private: () }
    }

    /// Registers `C`'s section metadata (prefix, keys, defaults) for
    /// discovery tooling and documentation generation.
    pub fn register<C: ConfigProperties>(&mut self) {
        crate::config::register_section::<C>();
    }
}

/// Read-only view over the loaded configuration, handed to [`Service::init`].
pub struct ConfigReader<'a> {
    config: &'a GovernorConfig,
}

impl<'a> ConfigReader<'a> {
    pub fn new(config: &'a GovernorConfig) -> Self {
        ConfigReader { config }
    }

    /// Resolves and validates `C`'s section from the underlying config.
    pub fn get<C: ConfigProperties>(&self) -> Result<C, ConfigError> {
        C::from_config(self.config)
    }

    /// Escape hatch for services that need raw key access beyond a typed
    /// `ConfigProperties` section.
    pub fn raw(&self) -> &GovernorConfig {
        self.config
    }
}

/// Collaborators every service's `init` needs regardless of its own
/// resource type.
#[derive(Clone)]
pub struct Kit {
    /// The kernel's root cancellation scope. Long-running loops a service
    /// spawns during `init`/`start` should select on this.
    pub cancellation_token: CancellationToken,
}

/// A first admin account to create as part of [`Service::setup`], if the
/// deployment is bootstrapping from empty state.
pub struct FirstUser {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// One-time administrative bootstrap request: create schemas/tables and
/// optionally a first admin account. A deployment gates this behind its own
/// setup secret before constructing one; services don't re-check `secret`.
pub struct ReqSetup {
    pub secret: String,
    pub first_user: Option<FirstUser>,
}

/// Lifecycle contract every Governor service implements.
///
/// The kernel calls `register` on every service before any `init` runs,
/// then `init` in dependency order, then `start` in the same order, then
/// `stop` in reverse order on shutdown. `setup` runs out-of-band, on an
/// operator-triggered bootstrap request.
pub trait Service: Send + Sync {
    /// Stable name used for dependency ordering and health reporting.
    fn name(&self) -> &str;

    /// Names of services that must be initialized before this one.
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    /// Declares this service's config section. Most services that don't
    /// carry their own `ConfigProperties` struct have nothing to register.
    fn register(&self, _registrar: &mut ConfigRegistrar) {}

    fn init<'a>(&'a self, config: &'a ConfigReader<'a>, kit: &'a Kit) -> Pin<Box<dyn Future<Output = Result<(), GovernorError>> + Send + 'a>>;

    fn start(&self) -> Pin<Box<dyn Future<Output = Result<(), GovernorError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn stop(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }

    /// Administrative bootstrap (schema creation, first-admin account).
    /// Most services have nothing to set up and keep the default no-op.
    fn setup<'a>(&'a self, _req: &'a ReqSetup) -> Pin<Box<dyn Future<Output = Result<(), GovernorError>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }

    fn health(&self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + '_>> {
        Box::pin(async { HealthStatus::Up })
    }
}

#[derive(Debug)]
pub enum KernelError {
    UnknownDependency { service: String, dependency: String },
    Cycle(Vec<String>),
    Init { service: String, source: GovernorError },
    Start { service: String, source: GovernorError },
    Setup { service: String, source: GovernorError },
}

impl std::fmt::Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::UnknownDependency { service, dependency } => {
                write!(f, "service '{service}' depends on unknown service '{dependency}'")
            }
            KernelError::Cycle(chain) => {
                write!(f, "dependency cycle: {}", chain.join(" -> "))
            }
            KernelError::Init { service, source } => {
                write!(f, "init failed for '{service}': {source}")
            }
            KernelError::Start { service, source } => {
                write!(f, "start failed for '{service}': {source}")
            }
            KernelError::Setup { service, source } => {
                write!(f, "setup failed for '{service}': {source}")
            }
        }
    }
}

impl std::error::Error for KernelError {}

/// Orders, initializes, starts, and stops a set of [`Service`]s.
pub struct Kernel {
    services: Vec<Box<dyn Service>>,
    order: Vec<usize>,
    root: CancellationToken,
    start_time: Instant,
}

impl Kernel {
    pub fn new() -> Self {
        Kernel {
            services: Vec::new(),
            order: Vec::new(),
            root: CancellationToken::new(),
            start_time: Instant::now(),
        }
    }

    /// Adds a service to the kernel. Order of registration does not matter;
    /// the kernel topologically sorts by declared dependencies before
    /// `init`. Distinct from [`Service::register`], which declares a
    /// service's own config section; call [`Kernel::register_all`] for that.
    pub fn register(&mut self, service: Box<dyn Service>) {
        self.services.push(service);
    }

    /// Calls [`Service::register`] on every added service so their config
    /// sections are declared before [`Kernel::init_all`] reads any of them.
    pub fn register_all(&self) {
        let mut registrar = ConfigRegistrar::new();
        for s in &self.services {
            s.register(&mut registrar);
        }
    }

    /// The kernel's root cancellation scope. Long-running loops (heartbeats,
    /// subscription readers) should select on this and exit when it fires.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root.clone()
    }

    fn topo_sort(&self) -> Result<Vec<usize>, KernelError> {
        let index_by_name: HashMap<&str, usize> = self
            .services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name(), i))
            .collect();

        for s in &self.services {
            for dep in s.dependencies() {
                if !index_by_name.contains_key(dep) {
                    return Err(KernelError::UnknownDependency {
                        service: s.name().to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        let mut visited = vec![0u8; self.services.len()]; // 0=unvisited,1=visiting,2=done
        let mut order = Vec::with_capacity(self.services.len());
        let mut stack_names = Vec::new();

        fn visit(
            i: usize,
            services: &[Box<dyn Service>],
            index_by_name: &HashMap<&str, usize>,
            visited: &mut [u8],
            order: &mut Vec<usize>,
            stack_names: &mut Vec<String>,
        ) -> Result<(), KernelError> {
            match visited[i] {
                2 => return Ok(()),
                1 => {
                    stack_names.push(services[i].name().to_string());
                    return Err(KernelError::Cycle(stack_names.clone()));
                }
                _ => {}
            }
            visited[i] = 1;
            stack_names.push(services[i].name().to_string());
            for dep in services[i].dependencies() {
                let dep_idx = index_by_name[dep];
                visit(dep_idx, services, index_by_name, visited, order, stack_names)?;
            }
            stack_names.pop();
            visited[i] = 2;
            order.push(i);
            Ok(())
        }

        for i in 0..self.services.len() {
            visit(i, &self.services, &index_by_name, &mut visited, &mut order, &mut stack_names)?;
        }
        Ok(order)
    }

    /// Calls `init` on every service in dependency order, passing each a
    /// reader over `config` and the kernel's shared [`Kit`].
    pub async fn init_all(&mut self, config: &GovernorConfig) -> Result<(), KernelError> {
        self.order = self.topo_sort()?;
        let kit = Kit { cancellation_token: self.root.clone() };
        let reader = ConfigReader::new(config);
        for &i in &self.order {
            self.services[i]
                .init(&reader, &kit)
                .await
                .map_err(|source| KernelError::Init {
                    service: self.services[i].name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Calls `setup` on every service in dependency order. Intended for an
    /// operator-triggered bootstrap request, not the normal startup path.
    pub async fn setup_all(&self, req: &ReqSetup) -> Result<(), KernelError> {
        for &i in &self.order {
            self.services[i]
                .setup(req)
                .await
                .map_err(|source| KernelError::Setup {
                    service: self.services[i].name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Calls `start` on every service, in the same order as `init_all`.
    pub async fn start_all(&self) -> Result<(), KernelError> {
        for &i in &self.order {
            self.services[i]
                .start()
                .await
                .map_err(|source| KernelError::Start {
                    service: self.services[i].name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Cancels the root scope, then calls `stop` on every service in
    /// reverse dependency order.
    pub async fn stop_all(&self) {
        self.root.cancel();
        for &i in self.order.iter().rev() {
            self.services[i].stop().await;
        }
    }

    /// Aggregates `health()` from every registered service into a
    /// name-keyed report.
    pub async fn health(&self) -> HashMap<String, HealthStatus> {
        let mut out = HashMap::new();
        for s in &self.services {
            out.insert(s.name().to_string(), s.health().await);
        }
        out
    }

    /// `true` iff every service reports [`HealthStatus::Up`].
    pub async fn is_healthy(&self) -> bool {
        self.health().await.values().all(|s| s.is_up())
    }

    /// Aggregates every service's health into the same Up/Down-per-check
    /// report shape [`crate::health::HealthState`] produces, for an HTTP
    /// health route to serialize directly.
    pub async fn health_endpoint_response(&self) -> HealthReport {
        let mut checks = Vec::with_capacity(self.services.len());
        let mut all_up = true;
        for s in &self.services {
            let start = Instant::now();
            let status = s.health().await;
            let duration_ms = start.elapsed().as_millis() as u64;
            let (up, reason) = match status {
                HealthStatus::Up => (true, None),
                HealthStatus::Down(reason) => {
                    all_up = false;
                    (false, Some(reason))
                }
            };
            checks.push(HealthCheck {
                name: s.name().to_string(),
                up,
                reason,
                duration_ms,
            });
        }
        HealthReport {
            up: all_up,
            checks,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Recorder {
        name: &'static str,
        deps: &'static [&'static str],
        order: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl Service for Recorder {
        fn name(&self) -> &str {
            self.name
        }
        fn dependencies(&self) -> &[&str] {
            self.deps
        }
        fn init<'a>(&'a self, _config: &'a ConfigReader<'a>, _kit: &'a Kit) -> Pin<Box<dyn Future<Output = Result<(), GovernorError>> + Send + 'a>> {
            let order = Arc::clone(&self.order);
            let name = self.name.to_string();
            Box::pin(async move {
                order.lock().unwrap().push(name);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn init_runs_dependencies_first() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut kernel = Kernel::new();
        kernel.register(Box::new(Recorder { name: "db", deps: &[], order: Arc::clone(&order) }));
        kernel.register(Box::new(Recorder { name: "acl", deps: &["db"], order: Arc::clone(&order) }));
        kernel.register(Box::new(Recorder { name: "gate", deps: &["acl"], order: Arc::clone(&order) }));
        kernel.init_all(&GovernorConfig::empty()).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["db", "acl", "gate"]);
    }

    #[tokio::test]
    async fn detects_unknown_dependency() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut kernel = Kernel::new();
        kernel.register(Box::new(Recorder { name: "gate", deps: &["missing"], order }));
        let err = kernel.init_all(&GovernorConfig::empty()).await.unwrap_err();
        assert!(matches!(err, KernelError::UnknownDependency { .. }));
    }

    #[tokio::test]
    async fn health_aggregates_all_services() {
        struct Down;
        impl Service for Down {
            fn name(&self) -> &str { "down-svc" }
            fn init<'a>(&'a self, _config: &'a ConfigReader<'a>, _kit: &'a Kit) -> Pin<Box<dyn Future<Output = Result<(), GovernorError>> + Send + 'a>> {
                Box::pin(async { Ok(()) })
            }
            fn health(&self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + '_>> {
                Box::pin(async { HealthStatus::Down("disconnected".into()) })
            }
        }
        let mut kernel = Kernel::new();
        kernel.register(Box::new(Down));
        kernel.init_all(&GovernorConfig::empty()).await.unwrap();
        assert!(!kernel.is_healthy().await);
        let report = kernel.health().await;
        assert!(matches!(report["down-svc"], HealthStatus::Down(_)));

        let response = kernel.health_endpoint_response().await;
        assert!(!response.up);
        assert_eq!(response.checks.len(), 1);
        assert_eq!(response.checks[0].reason.as_deref(), Some("disconnected"));
    }

    #[tokio::test]
    async fn stop_all_cancels_root_token() {
        let mut kernel = Kernel::new();
        let token = kernel.cancellation_token();
        assert!(!token.is_cancelled());
        kernel.stop_all().await;
        assert!(token.is_cancelled());
    }

    struct ConfiguredService {
        registered: Arc<std::sync::atomic::AtomicBool>,
    }

    struct DummyConfig;
    impl ConfigProperties for DummyConfig {
        fn prefix() -> &'static str {
            "dummy"
        }
        fn properties_metadata() -> Vec<crate::config::PropertyMeta> {
            Vec::new()
        }
        fn from_config(_config: &GovernorConfig) -> Result<Self, ConfigError> {
            Ok(DummyConfig)
        }
    }

    impl Service for ConfiguredService {
        fn name(&self) -> &str {
            "configured"
        }
        fn register(&self, registrar: &mut ConfigRegistrar) {
            registrar.register::<DummyConfig>();
            self.registered.store(true, std::sync::atomic::Ordering::SeqCst);
        }
        fn init<'a>(&'a self, config: &'a ConfigReader<'a>, _kit: &'a Kit) -> Pin<Box<dyn Future<Output = Result<(), GovernorError>> + Send + 'a>> {
            Box::pin(async move {
                config.get::<DummyConfig>()?;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn register_all_invokes_each_service() {
        let registered = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let mut kernel = Kernel::new();
        kernel.register(Box::new(ConfiguredService { registered: Arc::clone(&registered) }));
        kernel.register_all();
        assert!(registered.load(std::sync::atomic::Ordering::SeqCst));
        kernel.init_all(&GovernorConfig::empty()).await.unwrap();
    }

    #[tokio::test]
    async fn setup_all_runs_service_bootstrap() {
        struct Bootstrapped(Arc<std::sync::Mutex<Option<String>>>);
        impl Service for Bootstrapped {
            fn name(&self) -> &str {
                "bootstrap"
            }
            fn init<'a>(&'a self, _config: &'a ConfigReader<'a>, _kit: &'a Kit) -> Pin<Box<dyn Future<Output = Result<(), GovernorError>> + Send + 'a>> {
                Box::pin(async { Ok(()) })
            }
            fn setup<'a>(&'a self, req: &'a ReqSetup) -> Pin<Box<dyn Future<Output = Result<(), GovernorError>> + Send + 'a>> {
                let seen = Arc::clone(&self.0);
                let secret = req.secret.clone();
                Box::pin(async move {
                    *seen.lock().unwrap() = Some(secret);
                    Ok(())
                })
            }
        }

        let seen = Arc::new(std::sync::Mutex::new(None));
        let mut kernel = Kernel::new();
        kernel.register(Box::new(Bootstrapped(Arc::clone(&seen))));
        kernel.init_all(&GovernorConfig::empty()).await.unwrap();
        kernel
            .setup_all(&ReqSetup { secret: "topsecret".to_string(), first_user: None })
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("topsecret"));
    }
}

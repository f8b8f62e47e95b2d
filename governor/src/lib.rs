//! Governor — a modular backend platform assembled from independent
//! resource-client crates behind a shared [`Lifecycle`](governor_core::Lifecycle)
//! and [`Service`](governor_core::Service) contract.
//!
//! This facade crate re-exports every sub-crate through a single dependency
//! with feature flags. Import what you need with:
//!
//! ```ignore
//! use governor::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature         | Default | Crate                     |
//! |-----------------|---------|---------------------------|
//! | `security`      | **yes** | `governor-security`       |
//! | `events`        | **yes** | `governor-events`         |
//! | `events-nats`   | no      | `governor-events-nats`    |
//! | `data`          | no      | `governor-data`           |
//! | `data-postgres` | no      | `governor-data-postgres`  |
//! | `objstore`      | no      | `governor-objstore`       |
//! | `acl`           | **yes** | `governor-acl`            |
//! | `gate`          | **yes** | `governor-gate`           |
//! | `full`          | no      | All of the above          |
//!
//! # Control flow at start-up
//!
//! The kernel calls `Service::register` on each service so it can declare
//! its config section, then `init` in dependency order (each lifecycle's
//! heartbeat loop is launched), then `start` (stream subscriptions are
//! spawned). `setup` runs separately, on an operator-triggered bootstrap
//! request rather than at every startup. On shutdown the kernel cancels its
//! root [`tokio_util::sync::CancellationToken`]; each service's `stop`
//! observes that cancellation and releases its client.
//!
//! ```ignore
//! use governor::prelude::*;
//! use std::sync::Arc;
//!
//! let secrets = Arc::new(StaticSecretReader::new(pg_credentials));
//! let db = PgClient::spawn(PgConfig::default(), secrets, CancellationToken::new()).await?;
//!
//! let events = LocalEventStream::new();
//! let acl: Arc<dyn AclStore> = Arc::new(InMemoryAclStore::new());
//!
//! let mut kernel = Kernel::new();
//! kernel.register(Box::new(DbService::new(db)));
//! kernel.register(Box::new(EventsService::new(events)));
//! kernel.register_all();
//! kernel.init_all(&config).await?;
//! kernel.start_all().await?;
//! // ... serve requests ...
//! kernel.stop_all().await;
//! ```

pub use governor_core;
pub use governor_core::{GovernorError, Kernel, KernelError, Lifecycle, Service};

#[cfg(feature = "security")]
pub use governor_security;

#[cfg(feature = "events")]
pub use governor_events;

#[cfg(feature = "events-nats")]
pub use governor_events_nats;

#[cfg(feature = "data")]
pub use governor_data;

#[cfg(feature = "data-postgres")]
pub use governor_data_postgres;

#[cfg(feature = "objstore")]
pub use governor_objstore;

#[cfg(feature = "acl")]
pub use governor_acl;

#[cfg(feature = "gate")]
pub use governor_gate;

/// Unified prelude — `use governor::prelude::*`.
pub mod prelude {
    pub use governor_core::prelude::*;

    #[cfg(feature = "security")]
    pub use governor_security::prelude::*;

    #[cfg(feature = "events")]
    pub use governor_events::prelude::*;

    #[cfg(feature = "data")]
    pub use governor_data::prelude::*;

    #[cfg(feature = "data-postgres")]
    pub use governor_data_postgres::prelude::*;

    #[cfg(feature = "objstore")]
    pub use governor_objstore::prelude::*;

    #[cfg(feature = "acl")]
    pub use governor_acl::prelude::*;

    #[cfg(feature = "gate")]
    pub use governor_gate::prelude::*;
}

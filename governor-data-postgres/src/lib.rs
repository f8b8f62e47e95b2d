//! Postgres-backed [`SqlExecutor`](governor_data::SqlExecutor) implementation.
//!
//! Connections live behind a single agent task ([`agent::PgClient`]) that
//! owns a `Lifecycle<PgPool>` and rebuilds the pool whenever the backing
//! [`SecretReader`](governor_core::secret::SecretReader) rotates credentials.
//! Callers never see the pool directly — every query goes through a bounded
//! operation channel.

pub mod agent;
pub mod config;
pub mod error;

pub use agent::{PgClient, PgCredentials};
pub use config::PgConfig;
pub use error::PgErrorExt;

pub mod prelude {
    pub use crate::{PgClient, PgConfig, PgCredentials, PgErrorExt};
    pub use governor_data::prelude::*;
}

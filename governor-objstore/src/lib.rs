//! S3-compatible object store client: `Init`, `Stat`, `Get`, `Put`, `Del`,
//! `Subdir`, `DelBucket`, `Ping`. Lifecycle-managed the same way
//! `governor-data-postgres` manages its Postgres pool.

pub mod client;
pub mod config;
pub mod error;
pub mod value;

pub use client::{ObjectStoreClient, S3Credentials, Subdir};
pub use config::S3Config;
pub use error::S3ErrorExt;
pub use value::{ObjectMeta, PutOptions};

pub mod prelude {
    pub use crate::{ObjectMeta, ObjectStoreClient, PutOptions, S3Config, S3Credentials, Subdir};
}

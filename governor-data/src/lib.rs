//! Backend-agnostic SQL executor contract.
//!
//! Concrete backends (e.g. `governor-data-postgres`) implement [`SqlExecutor`]
//! over their own connection handle. Errors are classified into
//! [`governor_core::ErrorKind`] rather than a separate enum, so every
//! Governor resource client shares one error vocabulary.

pub mod error;
pub mod executor;
pub mod value;

pub use error::DbError;
pub use executor::SqlExecutor;
pub use value::{Param, Row};

pub mod prelude {
    pub use crate::{DbError, Param, Row, SqlExecutor};
}

//! The narrow capability surface a DB client exposes to callers.

use std::future::Future;
use std::pin::Pin;

use crate::error::DbError;
use crate::value::{Param, Row};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe SQL execution surface. A backend (e.g. `governor-data-postgres`)
/// implements this over its own connection handle; callers never see the
/// concrete driver type.
pub trait SqlExecutor: Send + Sync {
    /// Runs a statement that doesn't return rows (INSERT/UPDATE/DELETE/DDL).
    /// Returns the number of affected rows.
    fn exec<'a>(&'a self, sql: &'a str, params: &'a [Param]) -> BoxFuture<'a, Result<u64, DbError>>;

    /// Runs a statement and returns every matching row.
    fn query<'a>(&'a self, sql: &'a str, params: &'a [Param]) -> BoxFuture<'a, Result<Vec<Row>, DbError>>;

    /// Runs a statement expected to return exactly one row.
    /// `ErrorKind::NotFound` if zero rows matched.
    fn query_one<'a>(&'a self, sql: &'a str, params: &'a [Param]) -> BoxFuture<'a, Result<Row, DbError>>;
}

//! Classifies `sqlx::Error` into Governor's shared [`DbError`] taxonomy by
//! Postgres error code (23505 unique, 42P01 undefined_table, 42501 authz).
//!
//! Orphan rules forbid `impl From<sqlx::Error> for DbError` here (`DbError`
//! is a re-export from `governor-core`, `sqlx::Error` is foreign), so this is
//! an extension trait instead.

use governor_data::error::{DbError, ErrorKind};

const CODE_UNIQUE_VIOLATION: &str = "23505";
const CODE_UNDEFINED_TABLE: &str = "42P01";
const CODE_INSUFFICIENT_PRIVILEGE: &str = "42501";

pub trait PgErrorExt {
    fn into_db_error(self) -> DbError;
}

impl PgErrorExt for sqlx::Error {
    fn into_db_error(self) -> DbError {
        match self {
            sqlx::Error::RowNotFound => DbError::not_found("row not found"),
            sqlx::Error::Database(db_err) => {
                let kind = match db_err.code().as_deref() {
                    Some(CODE_UNIQUE_VIOLATION) => ErrorKind::Unique,
                    Some(CODE_UNDEFINED_TABLE) => ErrorKind::UndefinedTable,
                    Some(CODE_INSUFFICIENT_PRIVILEGE) => ErrorKind::Authz,
                    _ => ErrorKind::Client,
                };
                let message = db_err.message().to_string();
                DbError::with_source(kind, message, db_err)
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                let message = self.to_string();
                DbError::with_source(ErrorKind::Connection, message, self)
            }
            other => {
                let message = other.to_string();
                DbError::with_source(ErrorKind::Client, message, other)
            }
        }
    }
}

//! Maps `async-nats` error types onto Governor's shared error taxonomy.
//! Orphan rules forbid `impl From<E> for GovernorError` here for the
//! `async_nats` error types, so this is an extension trait instead, the
//! same shape `governor-data-postgres`'s `PgErrorExt` uses for its own
//! driver-error bridge.

use governor_core::{ErrorKind, GovernorError};

pub trait NatsErrorExt {
    fn into_governor_error(self, context: &str) -> GovernorError;
}

impl<E> NatsErrorExt for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_governor_error(self, context: &str) -> GovernorError {
        let message = format!("{context}: {self}");
        GovernorError::with_source(ErrorKind::Connection, message, self)
    }
}

// `Box<dyn Error + Send + Sync>` (e.g. `async_nats::Error`) doesn't itself
// implement `std::error::Error` (the std blanket impl for `Box<E>` requires
// `E: Sized`), so it can't go through the generic impl above; handle it
// separately, without a `source` since `with_source` has the same bound.
impl NatsErrorExt for Box<dyn std::error::Error + Send + Sync> {
    fn into_governor_error(self, context: &str) -> GovernorError {
        let message = format!("{context}: {self}");
        GovernorError::new(ErrorKind::Connection, message)
    }
}

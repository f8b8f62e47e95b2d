//! Governor's DB error taxonomy is [`governor_core::GovernorError`] directly —
//! there is no separate `DbError` type, so every resource client shares one
//! vocabulary `ErrorKind::{NotFound,Unique,UndefinedTable,Authz,Connection,Client}`.

pub use governor_core::{ErrorKind, GovernorError as DbError};

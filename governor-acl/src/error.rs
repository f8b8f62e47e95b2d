//! Errors are reported as [`governor_core::GovernorError`] directly, the same
//! convention `governor-data` uses for its `DbError` alias — there is no
//! ACL-specific error enum.

pub use governor_core::{ErrorKind, GovernorError as AclError};

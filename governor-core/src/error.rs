//! Shared error taxonomy used by every resource client (lifecycle, DB, object
//! store, event stream, token service). Kinds, not identifiers: infrastructure
//! layers translate vendor-specific errors into one of these; domain services
//! decide whether to retry (connection kinds) or surface (everything else).

/// Classification of a [`GovernorError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure reaching an external resource. Retryable; the
    /// resource's heartbeat will recover it.
    Connection,
    /// Invariant violation or unexpected response from an external resource.
    /// Not retried.
    Client,
    /// Target entity absent.
    NotFound,
    /// Write violated a uniqueness constraint.
    Unique,
    /// Schema mismatch (missing table/relation).
    UndefinedTable,
    /// Permissions mismatch reported by the resource.
    Authz,
    /// Startup-time configuration error; aborts `Init`.
    InvalidConfig,
    /// A stream subscription was closed.
    ClientClosed,
    /// A stream subscription's partition/group has no active assignment.
    PartitionUnassigned,
    /// A message could not be decoded or is malformed.
    InvalidMsg,
    /// An API key did not match its stored hash.
    InvalidKey,
    /// Token issuance failed.
    Generate,
    /// No usable signer was available for the requested algorithm/kind.
    Signer,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Client => "client",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unique => "unique",
            ErrorKind::UndefinedTable => "undefined_table",
            ErrorKind::Authz => "authz",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::ClientClosed => "client_closed",
            ErrorKind::PartitionUnassigned => "partition_unassigned",
            ErrorKind::InvalidMsg => "invalid_msg",
            ErrorKind::InvalidKey => "invalid_key",
            ErrorKind::Generate => "generate",
            ErrorKind::Signer => "signer",
        }
    }
}

/// The error type shared by every Governor resource client.
pub struct GovernorError {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GovernorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        GovernorError {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        GovernorError {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Client, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }
}

impl std::fmt::Display for GovernorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::fmt::Debug for GovernorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for GovernorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for GovernorError {
    fn from(err: std::io::Error) -> Self {
        GovernorError::with_source(ErrorKind::Connection, "io error", err)
    }
}

impl From<crate::config::ConfigError> for GovernorError {
    fn from(err: crate::config::ConfigError) -> Self {
        GovernorError::new(ErrorKind::InvalidConfig, err.to_string())
    }
}

/// Generate `From<E> for GovernorError` implementations that map a vendor
/// error type to a specific [`ErrorKind`].
///
/// ```ignore
/// governor_core::map_error! {
///     sqlx::Error => Client,
///     std::io::Error => Connection,
/// }
/// ```
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $kind:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::GovernorError {
                fn from(err: $err_ty) -> Self {
                    $crate::GovernorError::with_source(
                        $crate::ErrorKind::$kind,
                        err.to_string(),
                        err,
                    )
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = GovernorError::not_found("user u1");
        assert_eq!(err.to_string(), "not_found: user u1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn from_io_error_is_connection_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: GovernorError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}

//! Token service error taxonomy, bridged into [`GovernorError`] the same way
//! every other resource client's error type is (see
//! `governor-data-postgres::error::PgErrorExt`).

use governor_core::{ErrorKind, GovernorError};

#[derive(Debug)]
pub enum TokenError {
    /// Token signing failed.
    Generate(String),
    /// No usable signer was available for the requested algorithm.
    NoActiveKey(String),
    /// A `kid` from a token header didn't match any known verifier.
    UnknownKeyId(String),
    /// Malformed token or bad signature.
    InvalidToken(String),
    /// `exp`/`nbf` check failed.
    Expired,
    /// `claims.kind` didn't match the kind the caller validated against.
    KindMismatch { expected: String, actual: String },
    /// Presented scope didn't satisfy the required scope.
    ScopeDenied,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Generate(msg) => write!(f, "token generation failed: {msg}"),
            TokenError::NoActiveKey(alg) => write!(f, "no active signing key for {alg}"),
            TokenError::UnknownKeyId(kid) => write!(f, "unknown key id: {kid}"),
            TokenError::InvalidToken(msg) => write!(f, "invalid token: {msg}"),
            TokenError::Expired => write!(f, "token expired"),
            TokenError::KindMismatch { expected, actual } => {
                write!(f, "token kind mismatch: expected {expected}, got {actual}")
            }
            TokenError::ScopeDenied => write!(f, "scope not satisfied"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<TokenError> for GovernorError {
    fn from(err: TokenError) -> Self {
        let kind = match &err {
            TokenError::Generate(_) => ErrorKind::Generate,
            TokenError::NoActiveKey(_) | TokenError::UnknownKeyId(_) => ErrorKind::Signer,
            TokenError::ScopeDenied => ErrorKind::Authz,
            TokenError::InvalidToken(_) | TokenError::Expired | TokenError::KindMismatch { .. } => ErrorKind::Client,
        };
        GovernorError::with_source(kind, err.to_string(), err)
    }
}

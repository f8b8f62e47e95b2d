//! Token Service: HS512/RS256/EdDSA keyrings, issuance, validation, scope
//! matching, JWKS export and background key rotation.

pub mod claims;
pub mod config;
pub mod error;
pub mod keyring;
pub mod secrets;
pub mod service;

pub use claims::{scope_satisfies, Claims, Kind};
pub use config::TokenConfig;
pub use error::TokenError;
pub use keyring::{KeyEntry, Keyring};
pub use secrets::{RsaKeyMaterial, TokenSecrets};
pub use service::TokenService;

pub mod prelude {
    pub use crate::{scope_satisfies, Claims, Kind, TokenConfig, TokenError, TokenSecrets, TokenService};
}

//! `AuthGate`: the authentication path applied as HTTP middleware (spec
//! §4.J). Credential extraction precedence is Basic → Bearer → cookie;
//! Basic splits into a system-token branch (`gov:system` username) and an
//! API-key branch; Bearer/cookie validate as access-kind tokens.

use std::sync::Arc;

use axum::http::HeaderMap;
use governor_acl::{AclStore, InMemoryApiKeyStore};
use governor_security::{scope_satisfies, Claims, Kind, TokenService};

use crate::context::AuthContext;
use crate::credential::{self, Credential};
use crate::error::GateError;

/// Returns `true` if a validated system claim is allowed through. Beyond
/// signature and scope, callers can restrict which system principals are
/// trusted with a predicate over the claim set.
pub type SystemAuthorizer = Arc<dyn Fn(&Claims) -> bool + Send + Sync>;

pub struct AuthGate {
    pub(crate) tokens: Arc<TokenService>,
    acl: Arc<dyn AclStore>,
    pub(crate) api_keys: Arc<InMemoryApiKeyStore>,
    realm: String,
    system_authorizer: SystemAuthorizer,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>, acl: Arc<dyn AclStore>, api_keys: Arc<InMemoryApiKeyStore>, realm: impl Into<String>) -> Self {
        AuthGate {
            tokens,
            acl,
            api_keys,
            realm: realm.into(),
            system_authorizer: Arc::new(|_: &Claims| true),
        }
    }

    pub fn with_system_authorizer(mut self, authorizer: SystemAuthorizer) -> Self {
        self.system_authorizer = authorizer;
        self
    }

    pub fn acl(&self) -> &Arc<dyn AclStore> {
        &self.acl
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Runs the credential-extraction and scope-check path. Returns the HTTP
    /// response to send on failure, already carrying the OAuth 2.0
    /// `WWW-Authenticate` challenge.
    pub async fn authenticate(&self, headers: &HeaderMap, scope: &str) -> Result<AuthContext, axum::response::Response> {
        match self.try_authenticate(headers, scope).await {
            Ok(ctx) => Ok(ctx),
            Err(err) => {
                tracing::warn!(%err, scope, "authentication failed");
                Err(err.into_response_with(&self.realm, scope))
            }
        }
    }

    async fn try_authenticate(&self, headers: &HeaderMap, scope: &str) -> Result<AuthContext, GateError> {
        let credential = credential::extract(headers).ok_or(GateError::MissingCredential)?;
        let scheme = credential.scheme();
        match credential {
            Credential::Basic { username, password } if username == "gov:system" => {
                let claims = self
                    .tokens
                    .validate(Kind::System, &password)
                    .await
                    .map_err(|e| GateError::InvalidToken { scheme, message: e.to_string() })?;
                if !scope_satisfies(&claims.scope, scope) {
                    return Err(GateError::InsufficientScope { scheme });
                }
                if !(self.system_authorizer)(&claims) {
                    return Err(GateError::Forbidden { scheme, reason: "system principal not authorized".to_string() });
                }
                Ok(AuthContext::system(claims.sub, claims.scope))
            }
            Credential::Basic { username: keyid, password: secret } => {
                let (userid, stored_scope) = self
                    .api_keys
                    .check(&keyid, &secret)
                    .ok_or(GateError::InvalidToken { scheme, message: "unknown api key".to_string() })?;
                if !scope_satisfies(&stored_scope, scope) {
                    return Err(GateError::InsufficientScope { scheme });
                }
                Ok(AuthContext::api_key(userid, stored_scope))
            }
            Credential::Bearer(token) | Credential::Cookie(token) => {
                let claims = self
                    .tokens
                    .validate(Kind::Access, &token)
                    .await
                    .map_err(|e| GateError::InvalidToken { scheme, message: e.to_string() })?;
                if !scope_satisfies(&claims.scope, scope) {
                    return Err(GateError::InsufficientScope { scheme });
                }
                Ok(AuthContext::token(claims))
            }
        }
    }
}

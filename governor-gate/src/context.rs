//! What a successful authentication yields: the caller's identity, the scope
//! the request was authenticated under, and whether the caller authenticated
//! via a system-kind credential.

use governor_security::Claims;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub userid: String,
    pub scope: String,
    pub is_system: bool,
    pub claims: Option<Claims>,
}

impl AuthContext {
    pub fn system(userid: impl Into<String>, scope: impl Into<String>) -> Self {
        AuthContext {
            userid: userid.into(),
            scope: scope.into(),
            is_system: true,
            claims: None,
        }
    }

    pub fn api_key(userid: impl Into<String>, scope: impl Into<String>) -> Self {
        AuthContext {
            userid: userid.into(),
            scope: scope.into(),
            is_system: false,
            claims: None,
        }
    }

    pub fn token(claims: Claims) -> Self {
        AuthContext {
            userid: claims.sub.clone(),
            scope: claims.scope.clone(),
            is_system: false,
            claims: Some(claims),
        }
    }
}

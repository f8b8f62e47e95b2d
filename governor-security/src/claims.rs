//! Token kinds and the claim set issued/validated by [`crate::TokenService`].

use serde::{Deserialize, Serialize};

/// A token is valid for kind `K` only if `claims.kind == K` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Access,
    Refresh,
    System,
    #[serde(rename = "oauth:access")]
    OauthAccess,
    #[serde(rename = "oauth:refresh")]
    OauthRefresh,
    #[serde(rename = "oauth:id")]
    OauthId,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Kind::Access => "access",
            Kind::Refresh => "refresh",
            Kind::System => "system",
            Kind::OauthAccess => "oauth:access",
            Kind::OauthRefresh => "oauth:refresh",
            Kind::OauthId => "oauth:id",
        };
        f.write_str(s)
    }
}

/// Standard JWT fields plus Governor's extensions (`kind`, `auth_time`,
/// `scope`, `key`, `session_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub kind: Kind,
    pub auth_time: i64,
    pub scope: String,
    pub key: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty", default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A required scope is satisfied by a presented scope string if it contains
/// the required token literally, or contains `all`, and does not contain
/// `forbidden`.
pub fn scope_satisfies(presented: &str, required: &str) -> bool {
    let tokens: std::collections::HashSet<&str> = presented.split_whitespace().collect();
    if tokens.contains("forbidden") {
        return false;
    }
    required.is_empty() || tokens.contains(required) || tokens.contains("all")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_scope_match() {
        assert!(scope_satisfies("read write", "write"));
        assert!(!scope_satisfies("read", "write"));
    }

    #[test]
    fn all_scope_grants_anything() {
        assert!(scope_satisfies("all", "admin"));
    }

    #[test]
    fn forbidden_scope_always_denies() {
        assert!(!scope_satisfies("all forbidden", "admin"));
    }

    #[test]
    fn kind_display_matches_wire_names() {
        assert_eq!(Kind::OauthAccess.to_string(), "oauth:access");
    }
}

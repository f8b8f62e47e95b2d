//! Credential extraction, Basic → Bearer → cookie precedence.

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub enum Credential {
    Basic { username: String, password: String },
    Bearer(String),
    Cookie(String),
}

impl Credential {
    /// The `WWW-Authenticate` scheme a failure on this credential should be
    /// challenged with: `Basic` for a Basic-Auth attempt, `Bearer` for a
    /// bearer token or cookie-carried token.
    pub fn scheme(&self) -> &'static str {
        match self {
            Credential::Basic { .. } => "Basic",
            Credential::Bearer(_) | Credential::Cookie(_) => "Bearer",
        }
    }
}

pub fn extract(headers: &HeaderMap) -> Option<Credential> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(encoded) = auth.strip_prefix("Basic ") {
            if let Ok(decoded) = STANDARD.decode(encoded.trim()) {
                if let Ok(text) = String::from_utf8(decoded) {
                    // `rsplit_once` rather than `split_once`: the system
                    // username itself is `gov:system`, so the separator is
                    // the *last* colon, not the first.
                    if let Some((username, password)) = text.rsplit_once(':') {
                        return Some(Credential::Basic {
                            username: username.to_string(),
                            password: password.to_string(),
                        });
                    }
                }
            }
        }
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(Credential::Bearer(token.trim().to_string()));
        }
    }

    let cookie_header = headers.get(axum::http::header::COOKIE).and_then(|v| v.to_str().ok())?;
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("access_token=").map(|v| Credential::Cookie(v.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(name: axum::http::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, value.parse().unwrap());
        headers
    }

    #[test]
    fn basic_takes_precedence_over_cookie() {
        let mut headers = headers_with(axum::http::header::AUTHORIZATION, &format!("Basic {}", STANDARD.encode("gov:system:secret")));
        headers.insert(axum::http::header::COOKIE, "access_token=abc".parse().unwrap());
        match extract(&headers) {
            Some(Credential::Basic { username, password }) => {
                assert_eq!(username, "gov:system");
                assert_eq!(password, "secret");
            }
            _ => panic!("expected basic credential"),
        }
    }

    #[test]
    fn bearer_extracted_when_no_basic() {
        let headers = headers_with(axum::http::header::AUTHORIZATION, "Bearer tok123");
        assert!(matches!(extract(&headers), Some(Credential::Bearer(t)) if t == "tok123"));
    }

    #[test]
    fn cookie_used_when_no_authorization_header() {
        let headers = headers_with(axum::http::header::COOKIE, "other=1; access_token=xyz");
        assert!(matches!(extract(&headers), Some(Credential::Cookie(t)) if t == "xyz"));
    }

    #[test]
    fn no_credential_returns_none() {
        assert!(extract(&HeaderMap::new()).is_none());
    }
}

//! Typed gate errors, each mapping to an HTTP status plus a `WWW-Authenticate`
//! challenge and a JSON body.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub enum GateError {
    /// No credential was presented at all. Challenged as `Bearer`, the
    /// scheme a client with no credential is expected to obtain.
    MissingCredential,
    /// A credential was presented but failed to validate, under the scheme
    /// that credential was presented with.
    InvalidToken { scheme: &'static str, message: String },
    /// The presented credential's scope doesn't satisfy the required scope.
    InsufficientScope { scheme: &'static str },
    /// Authenticated, but the role/rank check failed.
    Forbidden { scheme: &'static str, reason: String },
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateError::MissingCredential => write!(f, "missing credential"),
            GateError::InvalidToken { message, .. } => write!(f, "invalid token: {message}"),
            GateError::InsufficientScope { .. } => write!(f, "insufficient scope"),
            GateError::Forbidden { reason, .. } => write!(f, "forbidden: {reason}"),
        }
    }
}

impl std::error::Error for GateError {}

impl GateError {
    fn scheme(&self) -> &'static str {
        match self {
            GateError::MissingCredential => "Bearer",
            GateError::InvalidToken { scheme, .. } => scheme,
            GateError::InsufficientScope { scheme } => scheme,
            GateError::Forbidden { scheme, .. } => scheme,
        }
    }

    /// Builds the response for this error under the given `realm` and
    /// required `scope`, challenging with the scheme the attempted
    /// credential used (or `Bearer` when none was presented).
    pub fn into_response_with(self, realm: &str, scope: &str) -> Response {
        let scheme = self.scheme();
        let (status, error_code, message) = match &self {
            GateError::MissingCredential => (StatusCode::UNAUTHORIZED, "invalid_token", "missing credential"),
            GateError::InvalidToken { .. } => (StatusCode::UNAUTHORIZED, "invalid_token", "invalid or expired credential"),
            GateError::InsufficientScope { .. } => (StatusCode::FORBIDDEN, "insufficient_scope", "insufficient scope"),
            GateError::Forbidden { .. } => (StatusCode::FORBIDDEN, "insufficient_scope", "forbidden"),
        };

        let challenge = format!(r#"{scheme} realm="{realm}", scope="{scope}", error="{error_code}""#);
        let mut response = (status, axum::Json(serde_json::json!({ "error": message }))).into_response();
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            response.headers_mut().insert(axum::http::header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        self.into_response_with("governor", "")
    }
}

//! Authentication errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Message returned for every token failure, whatever the cause.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

/// Message returned when no usable bearer header was sent.
pub const MISSING_TOKEN_MESSAGE: &str = "No valid authorization token provided";

/// Message returned for failed logins.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Authentication errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Username or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token lacks the delimiter or its claims cannot be decoded.
    #[error("malformed token")]
    MalformedToken,

    /// Integrity tag does not match the claims.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token is past its expiry.
    #[error("token expired")]
    Expired,

    /// Missing or non-bearer authorization header.
    #[error("missing authorization header")]
    MissingAuthHeader,

    /// Internal error.
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status and the message shown to the caller.
    ///
    /// Token failures share one message so callers cannot tell which check failed.
    pub fn public_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_MESSAGE),
            Self::MalformedToken | Self::InvalidSignature | Self::Expired => {
                (StatusCode::UNAUTHORIZED, INVALID_TOKEN_MESSAGE)
            }
            Self::MissingAuthHeader => (StatusCode::UNAUTHORIZED, MISSING_TOKEN_MESSAGE),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = self.public_parts();

        match &self {
            AuthError::Internal(msg) => error!(message = %msg, "Authentication error"),
            other => debug!(cause = %other, "Authentication rejected"),
        }

        (status, Json(AuthErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::Expired.to_string(), "token expired");
        assert_eq!(
            AuthError::Internal("boom".to_string()).to_string(),
            "internal auth error: boom"
        );
    }

    #[test]
    fn test_token_failures_are_indistinguishable() {
        let parts: Vec<_> = [
            AuthError::MalformedToken,
            AuthError::InvalidSignature,
            AuthError::Expired,
        ]
        .iter()
        .map(AuthError::public_parts)
        .collect();

        assert!(parts.iter().all(|p| *p == parts[0]));
        assert_eq!(parts[0], (StatusCode::UNAUTHORIZED, INVALID_TOKEN_MESSAGE));
    }
}

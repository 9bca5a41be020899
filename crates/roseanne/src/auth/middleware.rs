//! Bearer token extraction and the admin guard.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use super::{AuthError, Claims, TokenAuthenticator};

/// Extract a Bearer token from an Authorization header value.
pub fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::MissingAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::MissingAuthHeader)?;
    if parts.next().is_some() {
        return Err(AuthError::MissingAuthHeader);
    }

    Ok(token)
}

/// Authentication state shared across handlers.
#[derive(Clone, Debug)]
pub struct AuthState {
    authenticator: Arc<TokenAuthenticator>,
}

impl AuthState {
    pub fn new(authenticator: TokenAuthenticator) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
        }
    }

    pub fn authenticator(&self) -> &TokenAuthenticator {
        &self.authenticator
    }

    /// Verify the bearer token carried by request headers.
    pub fn authenticate_parts(&self, parts: &Parts) -> Result<Claims, AuthError> {
        self.authenticate_headers(&parts.headers)
    }

    pub fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingAuthHeader)?;
        let token = bearer_token_from_header(header)?;
        self.authenticator.verify(token)
    }
}

/// The authenticated admin, injected by [`require_admin`].
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub claims: Claims,
}

impl CurrentAdmin {
    pub fn username(&self) -> &str {
        &self.claims.subject
    }
}

impl<S> FromRequestParts<S> for CurrentAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAdmin>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Admin guard middleware.
///
/// Validates the `Authorization: Bearer <token>` header and injects
/// `CurrentAdmin` into request extensions.
pub async fn require_admin(
    State(auth): State<AuthState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = req.into_parts();
    let claims = auth.authenticate_parts(&parts)?;

    parts.extensions.insert(CurrentAdmin { claims });
    Ok(next.run(axum::http::Request::from_parts(parts, body)).await)
}

//! Login and token verification handlers.

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::{AuthError, AuthState};

const CREDENTIALS_REQUIRED: &str = "Username and password are required";

/// Login request.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    /// Expiry, milliseconds since epoch.
    pub expiry: i64,
    pub message: &'static str,
}

/// Exchange admin credentials for a bearer token.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = body.map_err(|_| ApiError::bad_request(CREDENTIALS_REQUIRED))?;

    let (Some(username), Some(password)) = (
        request.username.filter(|u| !u.is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request(CREDENTIALS_REQUIRED));
    };

    let issued = state.auth.authenticator().issue(&username, &password).await?;
    info!(username = %issued.claims.subject, "Admin logged in");

    Ok(Json(LoginResponse {
        success: true,
        token: issued.token,
        expiry: issued.claims.expires_at,
        message: "Login successful",
    }))
}

#[derive(Debug, Serialize)]
pub struct VerifiedUser {
    pub username: String,
}

/// Token verification response.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: VerifiedUser,
    pub expiry: i64,
}

/// Check the bearer token on the request.
pub async fn verify(
    State(auth): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, AuthError> {
    let claims = auth.authenticate_headers(&headers)?;
    Ok(Json(VerifyResponse {
        valid: true,
        user: VerifiedUser {
            username: claims.subject,
        },
        expiry: claims.expires_at,
    }))
}

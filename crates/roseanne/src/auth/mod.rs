//! Authentication module.
//!
//! Provides the admin token authenticator:
//! - password verifiers (legacy salted SHA-256 and bcrypt)
//! - stateless HMAC-signed bearer tokens with a fixed 24 hour TTL
//! - a bearer guard middleware for admin routes

mod config;
mod error;
mod middleware;
mod password;
mod token;

pub use config::{
    AuthConfig, AuthSettings, ConfigValidationError, FALLBACK_ADMIN_PASSWORD,
    FALLBACK_ADMIN_USERNAME, FALLBACK_JWT_SECRET,
};
pub use error::{
    AuthError, AuthErrorResponse, INVALID_CREDENTIALS_MESSAGE, INVALID_TOKEN_MESSAGE,
    MISSING_TOKEN_MESSAGE,
};
pub use middleware::{AuthState, CurrentAdmin, bearer_token_from_header, require_admin};
pub use password::{PasswordVerifier, hash_password, hash_password_bcrypt};
pub use token::{Claims, IssuedToken, TOKEN_DELIMITER, TOKEN_TTL_MS, TokenAuthenticator};

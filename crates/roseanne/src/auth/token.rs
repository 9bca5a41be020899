//! Stateless admin session tokens.
//!
//! A token is `<base64(json claims)>.<hex(hmac_sha256(secret, base64 claims))>`.
//! Nothing is stored server side: a token stays valid until its expiry or
//! until the signing secret changes.

use std::time::Duration;

use base64::{
    Engine, alphabet,
    engine::{
        DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD,
    },
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument};

use super::config::{AuthConfig, AuthSettings, ConfigValidationError};
use super::error::AuthError;
use super::password::{PasswordVerifier, constant_time_eq};

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime: 24 hours, in milliseconds.
pub const TOKEN_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Separates the encoded claims from the tag. Not part of the base64 alphabet.
pub const TOKEN_DELIMITER: char = '.';

/// Structural decoder for the claims portion. Accepts any padding and
/// non-canonical trailing bits so a tampered but well-formed payload is
/// reported by the tag check, not here.
const CLAIMS_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims carried by a token.
///
/// Wire names match the tokens issued by the original service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated username.
    #[serde(rename = "username")]
    pub subject: String,

    /// Issue time, milliseconds since epoch.
    #[serde(rename = "timestamp")]
    pub issued_at: i64,

    /// Expiry, milliseconds since epoch.
    #[serde(rename = "expiry")]
    pub expires_at: i64,
}

impl Claims {
    /// Claims for `subject` issued at `issued_at` with the fixed TTL.
    pub fn new(subject: impl Into<String>, issued_at: i64) -> Self {
        Self {
            subject: subject.into(),
            issued_at,
            expires_at: issued_at.saturating_add(TOKEN_TTL_MS),
        }
    }

    /// Whether the claims are expired at `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

/// A freshly issued token and its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Issues and verifies admin bearer tokens.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct TokenAuthenticator {
    admin_username: String,
    password_verifier: PasswordVerifier,
    signing_secret: Vec<u8>,
    failed_login_delay: Duration,
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("admin_username", &self.admin_username)
            .field("failed_login_delay", &self.failed_login_delay)
            .finish_non_exhaustive()
    }
}

impl TokenAuthenticator {
    pub fn new(settings: AuthSettings) -> Self {
        Self {
            admin_username: settings.admin_username,
            password_verifier: settings.password_verifier,
            signing_secret: settings.signing_secret,
            failed_login_delay: Duration::from_millis(settings.failed_login_delay_ms),
        }
    }

    /// Validate the config and build an authenticator from it.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigValidationError> {
        config.resolve().map(Self::new)
    }

    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    pub fn failed_login_delay(&self) -> Duration {
        self.failed_login_delay
    }

    /// Log in: on success returns a token valid for 24 hours.
    ///
    /// The password check runs on the blocking pool. A failed attempt waits
    /// for the configured delay before returning a generic
    /// `InvalidCredentials`, whichever field was wrong.
    #[instrument(skip(self, password))]
    pub async fn issue(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let username_ok = constant_time_eq(username.as_bytes(), self.admin_username.as_bytes());
        let verifier = self.password_verifier.clone();
        let password = password.to_owned();
        let password_ok = tokio::task::spawn_blocking(move || verifier.verify(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if username_ok & password_ok {
            return self.sign_at(username, Utc::now().timestamp_millis());
        }

        debug!("Rejecting login, delaying {:?}", self.failed_login_delay);
        tokio::time::sleep(self.failed_login_delay).await;
        Err(AuthError::InvalidCredentials)
    }

    /// Build and sign claims for `subject` issued at `now_ms`.
    pub fn sign_at(&self, subject: &str, now_ms: i64) -> Result<IssuedToken, AuthError> {
        let claims = Claims::new(subject, now_ms);
        let token = self.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Encode and sign arbitrary claims.
    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        let json = serde_json::to_vec(claims).map_err(|e| AuthError::Internal(e.to_string()))?;
        let payload = STANDARD.encode(json);
        let tag = self.tag(&payload)?;
        Ok(format!("{payload}{TOKEN_DELIMITER}{tag}"))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now().timestamp_millis())
    }

    /// Verify a token as of `now_ms`.
    pub fn verify_at(&self, token: &str, now_ms: i64) -> Result<Claims, AuthError> {
        let (payload, tag) = token
            .split_once(TOKEN_DELIMITER)
            .ok_or(AuthError::MalformedToken)?;
        if payload.is_empty() {
            return Err(AuthError::MalformedToken);
        }
        let json = CLAIMS_DECODER
            .decode(payload)
            .map_err(|_| AuthError::MalformedToken)?;

        let expected = self.tag(payload)?;
        if !constant_time_eq(expected.as_bytes(), tag.as_bytes()) {
            return Err(AuthError::InvalidSignature);
        }

        let claims: Claims =
            serde_json::from_slice(&json).map_err(|_| AuthError::MalformedToken)?;

        if claims.is_expired_at(now_ms) {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }

    /// Lowercase hex HMAC-SHA256 of the encoded claims.
    fn tag(&self, payload: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_secret)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::FALLBACK_JWT_SECRET;
    use crate::auth::password::hash_password;

    fn dev_authenticator() -> TokenAuthenticator {
        TokenAuthenticator::from_config(&AuthConfig::development()).unwrap()
    }

    fn authenticator_with_secret(secret: &str) -> TokenAuthenticator {
        TokenAuthenticator::new(AuthSettings {
            admin_username: "admin".to_string(),
            password_verifier: PasswordVerifier::parse(&hash_password("admin123")),
            signing_secret: secret.as_bytes().to_vec(),
            failed_login_delay_ms: 1000,
        })
    }

    #[test]
    fn test_claims_ttl() {
        let claims = Claims::new("admin", 1_000);
        assert_eq!(claims.expires_at, 1_000 + 86_400_000);
        assert!(!claims.is_expired_at(claims.expires_at - 1));
        assert!(claims.is_expired_at(claims.expires_at));
    }

    #[test]
    fn test_token_wire_format_is_stable() {
        let auth = authenticator_with_secret(FALLBACK_JWT_SECRET);
        let claims = Claims::new("admin", 1_700_000_000_000);
        let token = auth.encode(&claims).unwrap();
        assert_eq!(
            token,
            "eyJ1c2VybmFtZSI6ImFkbWluIiwidGltZXN0YW1wIjoxNzAwMDAwMDAwMDAwLCJleHBpcnkiOjE3MDAwODY0MDAwMDB9.\
             8c00cb92d924e91da4599ec8448cc59024b7bdd31436e5e5cadb1f9c9145d223"
        );
        assert_eq!(auth.verify_at(&token, 1_700_000_000_001).unwrap(), claims);
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let auth = dev_authenticator();
        let issued = auth.issue("admin", "admin123").await.unwrap();

        let claims = auth.verify(&issued.token).unwrap();
        assert_eq!(claims.subject, "admin");
        assert_eq!(claims, issued.claims);

        let now = Utc::now().timestamp_millis();
        assert!((claims.expires_at - (now + TOKEN_TTL_MS)).abs() < 5_000);
    }

    #[test]
    fn test_expiry_boundary() {
        let auth = dev_authenticator();
        let issued = auth.sign_at("admin", 10_000).unwrap();
        let expires_at = issued.claims.expires_at;

        assert!(auth.verify_at(&issued.token, 10_000).is_ok());
        assert!(auth.verify_at(&issued.token, expires_at - 1).is_ok());
        assert_eq!(
            auth.verify_at(&issued.token, expires_at),
            Err(AuthError::Expired)
        );
        assert_eq!(
            auth.verify_at(&issued.token, expires_at + 1),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_past_expiry_is_rejected() {
        let auth = dev_authenticator();
        let now = Utc::now().timestamp_millis();
        let claims = Claims {
            subject: "admin".to_string(),
            issued_at: now - TOKEN_TTL_MS - 60_000,
            expires_at: now - 60_000,
        };
        let token = auth.encode(&claims).unwrap();
        assert_eq!(auth.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_any_flipped_byte_fails_signature() {
        let auth = dev_authenticator();
        let issued = auth.sign_at("admin", Utc::now().timestamp_millis()).unwrap();
        let token = issued.token;
        let delimiter_at = token.find(TOKEN_DELIMITER).unwrap();

        for (i, original) in token.char_indices() {
            if i == delimiter_at {
                continue;
            }
            let replacement = if original == 'a' { 'b' } else { 'a' };
            let mut tampered = token.clone();
            tampered.replace_range(i..i + 1, &replacement.to_string());

            assert_eq!(
                auth.verify(&tampered),
                Err(AuthError::InvalidSignature),
                "flipping byte {i} should invalidate the signature"
            );
        }
    }

    #[test]
    fn test_uppercased_tag_is_rejected() {
        let auth = dev_authenticator();
        let token = auth.sign_at("admin", Utc::now().timestamp_millis()).unwrap().token;
        let (payload, tag) = token.split_once('.').unwrap();
        let tampered = format!("{payload}.{}", tag.to_uppercase());
        assert_eq!(auth.verify(&tampered), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_other_secret_fails_signature() {
        let issued = dev_authenticator().sign_at("admin", Utc::now().timestamp_millis()).unwrap();
        let rotated = authenticator_with_secret("a-completely-different-signing-secret");
        assert_eq!(
            rotated.verify(&issued.token),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let auth = dev_authenticator();
        assert_eq!(auth.verify(""), Err(AuthError::MalformedToken));
        assert_eq!(auth.verify("no-delimiter-here"), Err(AuthError::MalformedToken));
        assert_eq!(auth.verify(".deadbeef"), Err(AuthError::MalformedToken));

        for token in ["!!!.deadbeef", "%%%%.", "not base64 at all.abc", "a.b.c"] {
            assert_eq!(auth.verify(token), Err(AuthError::MalformedToken), "{token}");
        }

        // Correctly signed, but the claims portion is not base64.
        let payload = "!!not base64!!";
        let token = format!("{payload}.{}", auth.tag(payload).unwrap());
        assert_eq!(auth.verify(&token), Err(AuthError::MalformedToken));

        // Correctly signed base64, but not claims JSON.
        let payload = STANDARD.encode(br#"{"foo":1}"#);
        let token = format!("{payload}.{}", auth.tag(&payload).unwrap());
        assert_eq!(auth.verify(&token), Err(AuthError::MalformedToken));
    }

    #[tokio::test(start_paused = true)]
    async fn test_credentials_must_both_match() {
        let auth = dev_authenticator();
        assert!(auth.issue("admin", "admin123").await.is_ok());
        for (username, password) in [("admin", "admin124"), ("root", "admin123"), ("", "")] {
            assert!(auth.issue(username, password).await.is_err(), "{username}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_logins_are_generic_and_delayed() {
        let auth = dev_authenticator();

        for (username, password) in [("admin", "wrong"), ("root", "admin123")] {
            let started = tokio::time::Instant::now();
            let result = auth.issue(username, password).await;
            let elapsed = started.elapsed();

            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
            assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        }
    }

    #[tokio::test]
    async fn test_issue_with_bcrypt_verifier() {
        let auth = TokenAuthenticator::new(AuthSettings {
            admin_username: "admin".to_string(),
            password_verifier: PasswordVerifier::parse(&bcrypt::hash("s3cret", 4).unwrap()),
            signing_secret: b"bcrypt-test-signing-secret".to_vec(),
            failed_login_delay_ms: 0,
        });

        let issued = auth.issue("admin", "s3cret").await.unwrap();
        assert_eq!(auth.verify(&issued.token).unwrap().subject, "admin");
        assert!(matches!(
            auth.issue("admin", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_login_is_not_delayed() {
        let auth = dev_authenticator();
        let started = tokio::time::Instant::now();
        auth.issue("admin", "admin123").await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(1000));
    }
}

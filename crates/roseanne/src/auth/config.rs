//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::password::PasswordVerifier;

/// Username used when none is configured.
pub const FALLBACK_ADMIN_USERNAME: &str = "admin";

/// Password whose legacy verifier is used in dev mode when none is configured.
pub const FALLBACK_ADMIN_PASSWORD: &str = "admin123";

/// Signing secret used in dev mode when none is configured.
pub const FALLBACK_JWT_SECRET: &str = "your-super-secret-jwt-key-change-this";

/// Minimum signing secret length outside dev mode.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Allow the built-in fallback credentials and secret.
    pub dev_mode: bool,

    /// Admin username. Falls back to `admin`.
    pub admin_username: Option<String>,

    /// Admin password verifier: legacy hex SHA-256 or a bcrypt hash.
    /// REQUIRED when dev_mode is false.
    pub admin_password_hash: Option<String>,

    /// HMAC signing secret. Accepts `env:VAR_NAME`.
    /// REQUIRED when dev_mode is false.
    pub jwt_secret: Option<String>,

    /// Delay before answering a failed login, in milliseconds.
    pub failed_login_delay_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            admin_username: None,
            // No default credentials or secret - must be explicitly configured
            admin_password_hash: None,
            jwt_secret: None,
            failed_login_delay_ms: 1000,
        }
    }
}

/// Validated, immutable authentication settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub admin_username: String,
    pub password_verifier: PasswordVerifier,
    pub signing_secret: Vec<u8>,
    pub failed_login_delay_ms: u64,
}

impl AuthConfig {
    /// Configuration with every security-sensitive value left to the fallbacks.
    pub fn development() -> Self {
        Self {
            dev_mode: true,
            ..Self::default()
        }
    }

    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    /// Returns the resolved secret or None if not configured.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.to_string()))
                }
            }
        }
    }

    /// Validate and resolve into the settings used by the authenticator.
    ///
    /// Outside dev mode a missing or fallback secret or verifier is an error.
    /// In dev mode the fallbacks are substituted with a warning.
    pub fn resolve(&self) -> Result<AuthSettings, ConfigValidationError> {
        let admin_username = self
            .admin_username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(FALLBACK_ADMIN_USERNAME)
            .to_string();

        let secret = self.resolve_jwt_secret()?;
        let verifier = self
            .admin_password_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(PasswordVerifier::parse);
        let fallback_verifier = PasswordVerifier::legacy_from_password(FALLBACK_ADMIN_PASSWORD);

        let (secret, verifier) = if self.dev_mode {
            let secret = secret.unwrap_or_else(|| {
                warn!("No JWT secret configured, using the insecure development fallback");
                FALLBACK_JWT_SECRET.to_string()
            });
            let verifier = verifier.unwrap_or_else(|| {
                warn!("No admin password hash configured, using the development fallback password");
                fallback_verifier
            });
            (secret, verifier)
        } else {
            let secret = secret.ok_or(ConfigValidationError::MissingJwtSecret)?;
            if secret == FALLBACK_JWT_SECRET {
                return Err(ConfigValidationError::InsecureJwtSecret);
            }
            if secret.len() < MIN_JWT_SECRET_LEN {
                return Err(ConfigValidationError::JwtSecretTooShort);
            }

            let verifier = verifier.ok_or(ConfigValidationError::MissingPasswordHash)?;
            if verifier == fallback_verifier {
                return Err(ConfigValidationError::InsecurePasswordHash);
            }
            (secret, verifier)
        };

        Ok(AuthSettings {
            admin_username,
            password_verifier: verifier,
            signing_secret: secret.into_bytes(),
            failed_login_delay_ms: self.failed_login_delay_ms,
        })
    }

    /// Generate a secure random JWT secret.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error(
        "JWT secret is required when dev_mode is false. Set JWT_SECRET or auth.jwt_secret in config."
    )]
    MissingJwtSecret,

    #[error("JWT secret cannot be the built-in fallback value outside dev mode.")]
    InsecureJwtSecret,

    #[error("JWT secret must be at least 32 characters long.")]
    JwtSecretTooShort,

    #[error(
        "Admin password hash is required when dev_mode is false. Set ADMIN_PASSWORD_HASH or auth.admin_password_hash in config."
    )]
    MissingPasswordHash,

    #[error("Admin password hash cannot be the hash of the fallback password outside dev mode.")]
    InsecurePasswordHash,

    #[error("Environment variable '{0}' not found (referenced via env:{0} in config).")]
    EnvVarNotFound(String),

    #[error("Environment variable '{0}' is empty (referenced via env:{0} in config).")]
    EnvVarEmpty(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;

    const STRONG_SECRET: &str = "0123456789abcdef0123456789abcdef-strong";

    fn production_config() -> AuthConfig {
        AuthConfig {
            admin_username: Some("root".to_string()),
            admin_password_hash: Some(hash_password("correct horse")),
            jwt_secret: Some(STRONG_SECRET.to_string()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_default_is_not_dev_mode() {
        let config = AuthConfig::default();
        assert!(!config.dev_mode);
        assert_eq!(config.failed_login_delay_ms, 1000);
        assert_eq!(
            config.resolve().err(),
            Some(ConfigValidationError::MissingJwtSecret)
        );
    }

    #[test]
    fn test_development_uses_fallbacks() {
        let settings = AuthConfig::development().resolve().unwrap();
        assert_eq!(settings.admin_username, "admin");
        assert_eq!(settings.signing_secret, FALLBACK_JWT_SECRET.as_bytes());
        assert!(settings.password_verifier.verify("admin123"));
    }

    #[test]
    fn test_production_config_resolves() {
        let settings = production_config().resolve().unwrap();
        assert_eq!(settings.admin_username, "root");
        assert!(settings.password_verifier.verify("correct horse"));
    }

    #[test]
    fn test_production_rejects_fallback_secret() {
        let config = AuthConfig {
            jwt_secret: Some(FALLBACK_JWT_SECRET.to_string()),
            ..production_config()
        };
        assert_eq!(
            config.resolve().err(),
            Some(ConfigValidationError::InsecureJwtSecret)
        );
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let config = AuthConfig {
            jwt_secret: Some("short".to_string()),
            ..production_config()
        };
        assert_eq!(
            config.resolve().err(),
            Some(ConfigValidationError::JwtSecretTooShort)
        );
    }

    #[test]
    fn test_production_requires_password_hash() {
        let config = AuthConfig {
            admin_password_hash: None,
            ..production_config()
        };
        assert_eq!(
            config.resolve().err(),
            Some(ConfigValidationError::MissingPasswordHash)
        );

        let config = AuthConfig {
            admin_password_hash: Some(hash_password(FALLBACK_ADMIN_PASSWORD)),
            ..production_config()
        };
        assert_eq!(
            config.resolve().err(),
            Some(ConfigValidationError::InsecurePasswordHash)
        );
    }

    #[test]
    fn test_blank_username_falls_back() {
        let config = AuthConfig {
            admin_username: Some("   ".to_string()),
            ..production_config()
        };
        assert_eq!(config.resolve().unwrap().admin_username, "admin");
    }

    #[test]
    fn test_env_secret_missing_var() {
        let config = AuthConfig {
            jwt_secret: Some("env:ROSEANNE_TEST_SURELY_UNSET_SECRET_VAR".to_string()),
            ..production_config()
        };
        assert_eq!(
            config.resolve_jwt_secret(),
            Err(ConfigValidationError::EnvVarNotFound(
                "ROSEANNE_TEST_SURELY_UNSET_SECRET_VAR".to_string()
            ))
        );
    }

    #[test]
    fn test_generate_jwt_secret() {
        let secret = AuthConfig::generate_jwt_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, AuthConfig::generate_jwt_secret());
    }
}

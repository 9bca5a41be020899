//! Admin password verifiers.

use sha2::{Digest, Sha256};

/// Salt appended to the password by the legacy verifier.
const LEGACY_SALT: &str = "salt123";

/// Hash a password with the legacy verifier: `hex(sha256(password || salt))`.
///
/// The salt is a fixed literal shared by every installation. Prefer
/// [`hash_password_bcrypt`] for new credentials.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(LEGACY_SALT.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with bcrypt and a random per-credential salt.
pub fn hash_password_bcrypt(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// A configured password verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordVerifier {
    /// Hex SHA-256 over password + fixed salt.
    Legacy(String),
    /// bcrypt hash (`$2a$`, `$2b$`, `$2y$`).
    Bcrypt(String),
}

impl PasswordVerifier {
    /// Parse a stored verifier string, picking the format from its prefix.
    pub fn parse(stored: &str) -> Self {
        let stored = stored.trim();
        if stored.starts_with("$2") {
            Self::Bcrypt(stored.to_string())
        } else {
            Self::Legacy(stored.to_ascii_lowercase())
        }
    }

    /// Build the legacy verifier for a plaintext password.
    pub fn legacy_from_password(password: &str) -> Self {
        Self::Legacy(hash_password(password))
    }

    /// Check a plaintext password against this verifier.
    pub fn verify(&self, password: &str) -> bool {
        match self {
            Self::Legacy(expected) => {
                constant_time_eq(hash_password(password).as_bytes(), expected.as_bytes())
            }
            Self::Bcrypt(hash) => bcrypt::verify(password, hash).unwrap_or(false),
        }
    }
}

/// Compare two byte strings without short-circuiting on the first difference.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

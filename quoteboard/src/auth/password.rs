//! Password hashing and verification.
//!
//! Credentials are stored as Argon2id PHC strings. A transitional store may
//! still hold legacy plaintext passwords; [`CredentialKind`] classifies a
//! stored value so the login path can verify either form and migrate the
//! legacy one on first successful use.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::Error;

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Secure defaults for production (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// How a stored credential should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Canonical Argon2id PHC string
    Hashed,
    /// Pre-migration plaintext value
    LegacyPlaintext,
}

/// Classify a stored credential. Anything that parses as a PHC string is
/// treated as hashed; everything else is a legacy plaintext value.
pub fn credential_kind(stored: &str) -> CredentialKind {
    if PasswordHash::new(stored).is_ok() {
        CredentialKind::Hashed
    } else {
        CredentialKind::LegacyPlaintext
    }
}

/// Hash a password using Argon2id.
///
/// Uses the provided parameters or secure defaults if None.
pub fn hash_password_with_params(password: &str, params: Option<Argon2Params>) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = if let Some(p) = params {
        p.to_argon2()?
    } else {
        Argon2Params::default().to_argon2()?
    };

    let hash = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash password: {e}"),
    })?;

    Ok(hash.to_string())
}

/// Hash a password using Argon2id with default secure parameters.
pub fn hash_password(password: &str) -> Result<String, Error> {
    hash_password_with_params(password, None)
}

/// Verify a password against a stored PHC hash.
///
/// Note: Verification uses the parameters embedded in the hash itself.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse credential hash: {e}"),
    })?;

    // Verification always uses params from the hash
    let argon2 = Argon2::default();
    Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        assert!(!hash.is_empty());
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_hashes() {
        let password = "same_password";

        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();

        // Salted, so same input should produce different hashes
        assert_ne!(hash1, hash2);

        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_credential_kind_detects_phc_hash() {
        let hash = hash_password("pw123456").unwrap();
        assert_eq!(credential_kind(&hash), CredentialKind::Hashed);
    }

    #[test]
    fn test_credential_kind_detects_legacy_plaintext() {
        assert_eq!(credential_kind("pw123456"), CredentialKind::LegacyPlaintext);
        assert_eq!(credential_kind(""), CredentialKind::LegacyPlaintext);
        // Looks vaguely hash-like but is not a valid PHC string
        assert_eq!(credential_kind("$notahash$really"), CredentialKind::LegacyPlaintext);
    }

    #[test]
    fn test_hash_with_cheap_params_verifies() {
        let params = Argon2Params {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        };
        let hash = hash_password_with_params("pw", Some(params)).unwrap();
        assert!(verify_password("pw", &hash).unwrap());
    }
}

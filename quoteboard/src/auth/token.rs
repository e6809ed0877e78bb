//! Stateless token issuance and verification.
//!
//! Two classes of HS256 JWTs are issued: short-lived **access** tokens carried
//! in the `Authorization` header, and long-lived **refresh** tokens carried
//! only in a protected cookie. A `kind` claim ties each token to its class so
//! one can never be replayed as the other. Validity is purely a function of
//! the signature and `exp` - there is no server-side record of issued tokens,
//! so a token outlives logout until its natural expiry.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{api::models::users::Role, auth::current_user::AuthIdentity, config::Config, errors::Error, types::UserId};

/// Which class of token a set of claims belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims shared by both token classes.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    pub display_name: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Verification failure, split so the refresh path can distinguish an expired
/// token from a tampered one. The HTTP surface collapses both to a generic 401.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
    #[error("token verification: {0}")]
    Internal(String),
}

impl From<VerifyError> for Error {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Expired | VerifyError::Invalid => Error::Unauthenticated { message: None },
            VerifyError::Internal(operation) => Error::Internal { operation },
        }
    }
}

fn secret_key(config: &Config) -> Result<&str, Error> {
    config.secret_key.as_deref().ok_or_else(|| Error::Internal {
        operation: "issue tokens: secret_key is required".to_string(),
    })
}

/// Issue a token of the given kind for an authenticated identity.
pub fn issue(identity: &AuthIdentity, kind: TokenKind, config: &Config) -> Result<String, Error> {
    let ttl = match kind {
        TokenKind::Access => config.auth.security.access_token_ttl,
        TokenKind::Refresh => config.auth.security.refresh_token_ttl,
    };

    let now = Utc::now();
    let exp = now + chrono::Duration::from_std(ttl).map_err(|e| Error::Internal {
        operation: format!("compute token expiry: {e}"),
    })?;

    let claims = Claims {
        sub: identity.id,
        role: identity.role,
        display_name: identity.display_name.clone(),
        kind,
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    let key = EncodingKey::from_secret(secret_key(config)?.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

pub fn issue_access(identity: &AuthIdentity, config: &Config) -> Result<String, Error> {
    issue(identity, TokenKind::Access, config)
}

pub fn issue_refresh(identity: &AuthIdentity, config: &Config) -> Result<String, Error> {
    issue(identity, TokenKind::Refresh, config)
}

/// Verify a token and check it belongs to the expected class.
///
/// Pure and synchronous - no I/O. Client-caused failures map to
/// [`VerifyError::Expired`] / [`VerifyError::Invalid`]; key or configuration
/// trouble maps to [`VerifyError::Internal`].
pub fn verify(token: &str, expected: TokenKind, config: &Config) -> Result<Claims, VerifyError> {
    let secret = config
        .secret_key
        .as_deref()
        .ok_or_else(|| VerifyError::Internal("verify tokens: secret_key is required".to_string()))?;

    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerifyError::Expired,

        // Client errors - malformed tokens, bad signatures, invalid claims
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => VerifyError::Invalid,

        // Server errors - key issues, internal failures
        _ => VerifyError::Internal(format!("JWT verification: {e}")),
    })?;

    if token_data.claims.kind != expected {
        return Err(VerifyError::Invalid);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn create_test_config() -> Config {
        Config {
            secret_key: Some("test-secret-key-for-jwt".to_string()),
            ..Default::default()
        }
    }

    fn create_test_identity() -> AuthIdentity {
        AuthIdentity {
            id: Uuid::new_v4(),
            role: Role::User,
            display_name: "Test User".to_string(),
        }
    }

    fn encode_claims(claims: &Claims, secret: &str) -> String {
        let key = EncodingKey::from_secret(secret.as_bytes());
        encode(&Header::default(), claims, &key).unwrap()
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let config = create_test_config();
        let identity = create_test_identity();

        let token = issue_access(&identity, &config).unwrap();
        assert!(!token.is_empty());

        let claims = verify(&token, TokenKind::Access, &config).unwrap();
        assert_eq!(claims.sub, identity.id);
        assert_eq!(claims.role, identity.role);
        assert_eq!(claims.display_name, identity.display_name);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let config = create_test_config();
        let identity = create_test_identity();

        let refresh = issue_refresh(&identity, &config).unwrap();
        let result = verify(&refresh, TokenKind::Access, &config);
        assert_eq!(result.unwrap_err(), VerifyError::Invalid);
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let config = create_test_config();
        let identity = create_test_identity();

        let access = issue_access(&identity, &config).unwrap();
        let result = verify(&access, TokenKind::Refresh, &config);
        assert_eq!(result.unwrap_err(), VerifyError::Invalid);
    }

    #[test]
    fn test_verify_wrong_secret_is_invalid_not_internal() {
        let mut config = create_test_config();
        let identity = create_test_identity();

        let token = issue_access(&identity, &config).unwrap();

        config.secret_key = Some("different-secret".to_string());
        let result = verify(&token, TokenKind::Access, &config);
        assert_eq!(result.unwrap_err(), VerifyError::Invalid);
    }

    #[test]
    fn test_verify_expired_token() {
        let config = create_test_config();
        let identity = create_test_identity();
        let now = Utc::now();

        let claims = Claims {
            sub: identity.id,
            role: identity.role,
            display_name: identity.display_name.clone(),
            kind: TokenKind::Access,
            iat: (now - chrono::Duration::hours(2)).timestamp(),
            exp: (now - chrono::Duration::hours(1)).timestamp(),
        };
        let token = encode_claims(&claims, config.secret_key.as_deref().unwrap());

        let result = verify(&token, TokenKind::Access, &config);
        assert_eq!(result.unwrap_err(), VerifyError::Expired);
    }

    #[test]
    fn test_expired_refresh_never_verifies() {
        let config = create_test_config();
        let identity = create_test_identity();
        let now = Utc::now();

        let claims = Claims {
            sub: identity.id,
            role: identity.role,
            display_name: identity.display_name.clone(),
            kind: TokenKind::Refresh,
            iat: (now - chrono::Duration::days(8)).timestamp(),
            exp: (now - chrono::Duration::days(1)).timestamp(),
        };
        let token = encode_claims(&claims, config.secret_key.as_deref().unwrap());

        assert_eq!(verify(&token, TokenKind::Refresh, &config).unwrap_err(), VerifyError::Expired);
    }

    #[test]
    fn test_verify_malformed_tokens() {
        let config = create_test_config();

        for token in ["not.a.token", "invalid", "", "too.many.parts.in.this.token"] {
            let result = verify(token, TokenKind::Access, &config);
            assert!(
                matches!(result.unwrap_err(), VerifyError::Invalid),
                "expected Invalid for token: {token}"
            );
        }
    }

    #[test]
    fn test_missing_secret_is_internal() {
        let mut config = create_test_config();
        config.secret_key = None;

        let result = verify("whatever", TokenKind::Access, &config);
        assert!(matches!(result.unwrap_err(), VerifyError::Internal(_)));
    }
}

//! The typed authenticated identity and its extractor.
//!
//! The session middleware verifies the access token once per request and
//! attaches an [`AuthIdentity`] to the request extensions. Handlers consume it
//! as an extractor argument - an explicitly-passed value object, not a side
//! channel of synthesized headers - so every authorization decision works from
//! the same verified claims.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    AppState,
    api::models::users::Role,
    auth::token::Claims,
    db::models::users::UserDBResponse,
    errors::{Error, Result},
    types::UserId,
};

/// Identity attached to every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthIdentity {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub role: Role,
    pub display_name: String,
}

impl AuthIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for AuthIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            display_name: claims.display_name,
        }
    }
}

impl From<&UserDBResponse> for AuthIdentity {
    fn from(user: &UserDBResponse) -> Self {
        Self {
            id: user.id,
            role: user.role,
            display_name: user.display_name.clone(),
        }
    }
}

impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self> {
        parts
            .extensions
            .get::<AuthIdentity>()
            .cloned()
            .ok_or(Error::Unauthenticated { message: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenKind;
    use uuid::Uuid;

    #[test]
    fn test_is_admin() {
        let admin = AuthIdentity {
            id: Uuid::new_v4(),
            role: Role::Admin,
            display_name: "Admin".to_string(),
        };
        let user = AuthIdentity {
            id: Uuid::new_v4(),
            role: Role::User,
            display_name: "User".to_string(),
        };
        assert!(admin.is_admin());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_identity_from_claims() {
        let id = Uuid::new_v4();
        let claims = Claims {
            sub: id,
            role: Role::User,
            display_name: "Somebody".to_string(),
            kind: TokenKind::Access,
            iat: 0,
            exp: 0,
        };
        let identity = AuthIdentity::from(claims);
        assert_eq!(identity.id, id);
        assert_eq!(identity.role, Role::User);
        assert_eq!(identity.display_name, "Somebody");
    }
}

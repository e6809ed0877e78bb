//! Central authorization decision point.
//!
//! Every route states its requirement declaratively by taking a
//! [`RequiresPermission`] extractor, typed over a resource and operation
//! marker:
//!
//! ```ignore
//! pub async fn list_users(
//!     State(state): State<AppState>,
//!     _: RequiresPermission<resource::Users, operation::ReadAll>,
//! ) -> Result<Json<ApiResponse<Vec<UserResponse>>>, Error> { ... }
//! ```
//!
//! The extractor returns 401 when no identity is attached to the request and
//! 403 when the rule for that (resource, operation) pair denies the identity.
//! Rules live here, in one place, instead of as inline conditionals scattered
//! across handlers.
//!
//! Vendor writes carry the one non-role rule: a non-admin may write when
//! their vendor-edit capability window is active. The window is re-read from
//! the store on **every** check, never cached, so a revoked or expired grant
//! is denied on the very next request without any sweep or cleanup job.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};

use crate::{
    AppState,
    auth::current_user::AuthIdentity,
    db::{handlers::Users, handlers::repository::Repository, models::users::UserDBResponse},
    errors::{Error, Result},
    types::{Operation, Permission, Resource},
};

/// Resource marker types for [`RequiresPermission`].
pub mod resource {
    pub struct Users;
    pub struct RegistrationCodes;
    pub struct Vendors;
}

/// Operation marker types for [`RequiresPermission`].
pub mod operation {
    pub struct ReadAll;
    pub struct CreateAll;
    pub struct UpdateAll;
    pub struct DeleteAll;
}

/// An authorization rule for one (resource, operation) pair.
#[async_trait::async_trait]
pub trait PermissionRule {
    async fn evaluate(state: &AppState, identity: &AuthIdentity) -> Result<()>;
}

/// Reject non-admin identities with a 403 naming the denied permission.
pub fn require_admin(identity: &AuthIdentity, resource: Resource, action: Operation) -> Result<()> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            required: Permission::Allow(resource, action),
            action,
            resource: resource.to_string(),
        })
    }
}

/// Is the user's vendor-edit window active at `now`?
///
/// Pure so expiry semantics are testable without a store: a window is active
/// only while `enabled` is set and `now` is strictly before `expires_at`.
pub fn vendor_edit_window_active(user: &UserDBResponse, now: DateTime<Utc>) -> bool {
    user.vendor_edit_enabled && user.vendor_edit_expires_at.map(|expires_at| now < expires_at).unwrap_or(false)
}

macro_rules! admin_rule {
    ($res:ty, $op:ty, $resource:expr, $operation:expr) => {
        #[async_trait::async_trait]
        impl PermissionRule for ($res, $op) {
            async fn evaluate(_state: &AppState, identity: &AuthIdentity) -> Result<()> {
                require_admin(identity, $resource, $operation)
            }
        }
    };
}

admin_rule!(resource::Users, operation::ReadAll, Resource::Users, Operation::ReadAll);
admin_rule!(resource::Users, operation::UpdateAll, Resource::Users, Operation::UpdateAll);
admin_rule!(resource::Users, operation::DeleteAll, Resource::Users, Operation::DeleteAll);
admin_rule!(
    resource::RegistrationCodes,
    operation::CreateAll,
    Resource::RegistrationCodes,
    Operation::CreateAll
);
admin_rule!(
    resource::RegistrationCodes,
    operation::ReadAll,
    Resource::RegistrationCodes,
    Operation::ReadAll
);
admin_rule!(
    resource::RegistrationCodes,
    operation::DeleteAll,
    Resource::RegistrationCodes,
    Operation::DeleteAll
);

/// Vendor writes: admin, or an active vendor-edit capability window.
async fn evaluate_vendor_write(state: &AppState, identity: &AuthIdentity, action: Operation) -> Result<()> {
    if identity.is_admin() {
        return Ok(());
    }

    let denied = || Error::InsufficientPermissions {
        required: Permission::Granted,
        action,
        resource: Resource::Vendors.to_string(),
    };

    // Fresh read on every check: the grant may have been revoked or expired
    // since the token was issued.
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);
    let user = users.get_by_id(identity.id).await?.filter(|u| u.is_active).ok_or_else(denied)?;

    if vendor_edit_window_active(&user, Utc::now()) {
        Ok(())
    } else {
        Err(denied())
    }
}

#[async_trait::async_trait]
impl PermissionRule for (resource::Vendors, operation::UpdateAll) {
    async fn evaluate(state: &AppState, identity: &AuthIdentity) -> Result<()> {
        evaluate_vendor_write(state, identity, Operation::UpdateAll).await
    }
}

#[async_trait::async_trait]
impl PermissionRule for (resource::Vendors, operation::CreateAll) {
    async fn evaluate(state: &AppState, identity: &AuthIdentity) -> Result<()> {
        evaluate_vendor_write(state, identity, Operation::CreateAll).await
    }
}

/// Declarative per-route permission requirement.
///
/// Extraction runs the rule for the `(R, O)` pair against the identity the
/// session middleware attached; handlers receive the identity along with the
/// proof that the rule passed.
pub struct RequiresPermission<R, O> {
    pub identity: AuthIdentity,
    _rule: PhantomData<fn() -> (R, O)>,
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    (R, O): PermissionRule,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let identity = parts
            .extensions
            .get::<AuthIdentity>()
            .cloned()
            .ok_or(Error::Unauthenticated { message: None })?;

        <(R, O)>::evaluate(state, &identity).await?;

        Ok(Self {
            identity,
            _rule: PhantomData,
        })
    }
}

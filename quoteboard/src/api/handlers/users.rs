use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{Duration, Utc};

use crate::{
    AppState,
    api::models::{
        ApiResponse,
        users::{ListUsersQuery, UserResponse, VendorEditGrant},
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::{Repository, Users, users::UserFilter},
    errors::Error,
    types::UserId,
};

// GET /auth/users - List users (admin only)
#[utoipa::path(
    get,
    path = "/auth/users",
    tag = "users",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "List of users", body = [UserResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, Error> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(100).min(1000);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);
    let listed = users.list(&UserFilter::new(skip, limit)).await?;

    Ok(Json(ApiResponse::ok(listed.into_iter().map(UserResponse::from).collect())))
}

// DELETE /auth/users/{id} - Soft-delete a user (admin only, no self-delete)
#[utoipa::path(
    delete,
    path = "/auth/users/{id}",
    tag = "users",
    summary = "Deactivate a user",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required, or self-delete attempted"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    perm: RequiresPermission<resource::Users, operation::DeleteAll>,
) -> Result<Json<ApiResponse<()>>, Error> {
    if perm.identity.id == id {
        return Err(Error::InsufficientPermissions {
            required: crate::types::Permission::Allow(crate::types::Resource::Users, crate::types::Operation::DeleteAll),
            action: crate::types::Operation::DeleteAll,
            resource: "own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);

    // Soft delete: the row survives, the account stops authenticating
    let deactivated = users.delete(id).await?;
    if !deactivated {
        return Err(Error::NotFound {
            resource: "user".to_string(),
            id: id.to_string(),
        });
    }

    Ok(Json(ApiResponse::message("User deactivated")))
}

// PUT /auth/users/{id}/reset-password - Reset to the configured default (admin only)
#[utoipa::path(
    put,
    path = "/auth/users/{id}/reset-password",
    tag = "users",
    summary = "Reset a user's password to the configured default",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Password reset"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    _: RequiresPermission<resource::Users, operation::UpdateAll>,
) -> Result<Json<ApiResponse<()>>, Error> {
    // The default is stored hashed like any other credential; the account
    // owner is expected to change it on first login.
    let default_hash = super::auth::hash_password_blocking(&state.config, &state.config.auth.password.reset_default).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);
    let updated = users.set_credential(id, &default_hash).await?;
    if !updated {
        return Err(Error::NotFound {
            resource: "user".to_string(),
            id: id.to_string(),
        });
    }

    Ok(Json(ApiResponse::message("Password reset to default")))
}

// POST /users/{id}/vendor-edit - Set or clear the vendor-edit window (admin only)
#[utoipa::path(
    post,
    path = "/users/{id}/vendor-edit",
    tag = "users",
    summary = "Grant or revoke a temporary vendor-edit window",
    request_body = VendorEditGrant,
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Window updated", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn grant_vendor_edit(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    _: RequiresPermission<resource::Users, operation::UpdateAll>,
    Json(request): Json<VendorEditGrant>,
) -> Result<Json<ApiResponse<UserResponse>>, Error> {
    let expires_at = if request.enable {
        let hours = request.hours.unwrap_or(state.config.auth.vendor_edit_default_hours);
        if hours <= 0 {
            return Err(Error::BadRequest {
                message: "Window duration must be a positive number of hours".to_string(),
            });
        }
        Some(Utc::now() + Duration::hours(hours))
    } else {
        // Disabling clears the window entirely; nothing is left to sweep
        None
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);
    let user = users
        .set_vendor_edit_window(id, request.enable, expires_at)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "user".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(ApiResponse::ok_with_message(user.into(), "Vendor-edit window updated")))
}

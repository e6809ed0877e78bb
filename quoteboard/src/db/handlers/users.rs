//! Database repository for users.

use std::str::FromStr;

use crate::types::{UserId, abbrev_uuid};
use crate::{
    api::models::users::Role,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

// Database entity model. The role column is TEXT; it is parsed into the typed
// Role at the repository boundary so nothing above this layer sees strings.
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub username: String,
    pub credential: String,
    pub display_name: String,
    pub role: String,
    pub vendor_edit_enabled: bool,
    pub vendor_edit_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<User> for UserDBResponse {
    type Error = DbError;

    fn try_from(user: User) -> Result<Self> {
        let role = Role::from_str(&user.role)
            .map_err(|_| DbError::Other(anyhow::anyhow!("unknown role '{}' stored for user {}", user.role, user.id)))?;
        Ok(Self {
            id: user.id,
            username: user.username,
            credential: user.credential,
            display_name: user.display_name,
            role,
            vendor_edit_enabled: user.vendor_edit_enabled,
            vendor_edit_expires_at: user.vendor_edit_expires_at,
            is_active: user.is_active,
            created_by: user.created_by,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

const USER_COLUMNS: &str = "id, username, credential, display_name, role, vendor_edit_enabled, \
     vendor_edit_expires_at, is_active, created_by, created_at, updated_at";

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user_id = Uuid::new_v4();

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, credential, display_name, role, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&request.username)
        .bind(&request.credential)
        .bind(&request.display_name)
        .bind(request.role.as_str())
        .bind(&request.created_by)
        .fetch_one(&mut *self.db)
        .await?;

        user.try_into()
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        user.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        users.into_iter().map(TryInto::try_into).collect()
    }

    /// Accounts are never hard-deleted; delete deactivates the account.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                display_name = COALESCE($2, display_name),
                credential = COALESCE($3, credential),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&request.display_name)
        .bind(&request.credential)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        user.try_into()
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up an active user by username. Soft-deleted accounts are invisible
    /// to authentication.
    #[instrument(skip(self), err)]
    pub async fn get_active_by_username(&mut self, username: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active"
        ))
        .bind(username)
        .fetch_optional(&mut *self.db)
        .await?;

        user.map(TryInto::try_into).transpose()
    }

    /// Overwrite the stored credential. Callers are responsible for passing a
    /// canonical Argon2id PHC string; this is the single write path used by
    /// change-password, admin reset, and the lazy plaintext migration.
    #[instrument(skip(self, credential), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn set_credential(&mut self, id: UserId, credential: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET credential = $2, updated_at = NOW() WHERE id = $1 AND is_active")
            .bind(id)
            .bind(credential)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the vendor-edit capability window on an active user.
    /// Returns None when the target does not exist or is deactivated.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn set_vendor_edit_window(
        &mut self,
        id: UserId,
        enabled: bool,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET vendor_edit_enabled = $2, vendor_edit_expires_at = $3, updated_at = NOW()
             WHERE id = $1 AND is_active
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(enabled)
        .bind(expires_at)
        .fetch_optional(&mut *self.db)
        .await?;

        user.map(TryInto::try_into).transpose()
    }
}

//! Database models for users.

use crate::api::models::users::Role;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to create a user row. The credential is whatever the caller wants
/// stored verbatim: registration and admin flows pass an Argon2id PHC string,
/// test fixtures may pass legacy plaintext to exercise the migration path.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub credential: String,
    pub display_name: String,
    pub role: Role,
    pub created_by: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub display_name: Option<String>,
    pub credential: Option<String>,
}

/// Full user row as returned by the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    pub credential: String,
    pub display_name: String,
    pub role: Role,
    pub vendor_edit_enabled: bool,
    pub vendor_edit_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

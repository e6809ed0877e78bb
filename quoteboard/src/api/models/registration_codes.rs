//! API request/response models for registration codes.

use crate::db::models::registration_codes::RegistrationCodeDBResponse;
use crate::types::RegistrationCodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCodeResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RegistrationCodeId,
    pub code: String,
    pub is_used: bool,
    pub used_by: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<RegistrationCodeDBResponse> for RegistrationCodeResponse {
    fn from(db: RegistrationCodeDBResponse) -> Self {
        Self {
            id: db.id,
            code: db.code,
            is_used: db.is_used,
            used_by: db.used_by,
            used_at: db.used_at,
            expires_at: db.expires_at,
            created_by: db.created_by,
            created_at: db.created_at,
        }
    }
}

/// Query parameters for listing registration codes
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListCodesQuery {
    /// Only return unused, unexpired codes
    pub active: Option<bool>,
}

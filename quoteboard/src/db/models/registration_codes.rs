//! Database models for registration codes.

use crate::types::RegistrationCodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct RegistrationCodeCreateDBRequest {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationCodeDBResponse {
    pub id: RegistrationCodeId,
    pub code: String,
    pub is_used: bool,
    pub used_by: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl RegistrationCodeDBResponse {
    /// A code is redeemable while unused and unexpired.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now < self.expires_at
    }
}

/// Filter for listing registration codes
#[derive(Debug, Clone, Default)]
pub struct RegistrationCodeFilter {
    /// Only return unused, unexpired codes
    pub active_only: bool,
}

//! Database models for vendors.

use crate::types::VendorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct VendorCreateDBRequest {
    pub name: String,
    pub contact: Option<String>,
    pub notes: Option<String>,
    pub updated_by: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct VendorUpdateDBRequest {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VendorDBResponse {
    pub id: VendorId,
    pub name: String,
    pub contact: Option<String>,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

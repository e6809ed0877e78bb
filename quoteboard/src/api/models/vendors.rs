//! API request/response models for vendors.

use crate::db::models::vendors::VendorDBResponse;
use crate::types::VendorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: VendorId,
    pub name: String,
    pub contact: Option<String>,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VendorDBResponse> for VendorResponse {
    fn from(db: VendorDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            contact: db.contact,
            notes: db.notes,
            updated_by: db.updated_by,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorCreate {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorUpdate {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub notes: Option<String>,
}

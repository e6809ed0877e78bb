//! API response models for public status banners.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maintenance or announcement banner state polled by unauthenticated clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BannerStatus {
    pub enabled: bool,
    pub message: Option<String>,
}

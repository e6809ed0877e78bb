//! API request/response models.
//!
//! Every endpoint answers with the same envelope: `{success, message?, data?,
//! errors?}`. Success paths build it through [`ApiResponse`]; error paths
//! build it in the [`crate::errors::Error`] `IntoResponse` impl so clients
//! only ever parse one shape.

pub mod auth;
pub mod registration_codes;
pub mod status;
pub mod users;
pub mod vendors;

use serde::{Deserialize, Serialize};

/// Uniform response envelope for successful requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A bare success acknowledgement with no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    api::models::{
        ApiResponse,
        vendors::{VendorCreate, VendorResponse, VendorUpdate},
    },
    auth::{
        current_user::AuthIdentity,
        permissions::{RequiresPermission, operation, resource},
    },
    db::{
        handlers::{Repository, Vendors, vendors::VendorFilter},
        models::vendors::{VendorCreateDBRequest, VendorUpdateDBRequest},
    },
    errors::Error,
    types::VendorId,
};

/// Created-vendor response with a 201 status.
pub struct VendorCreatedResponse {
    body: ApiResponse<VendorResponse>,
}

impl IntoResponse for VendorCreatedResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.body)).into_response()
    }
}

// GET /vendors - List vendors (any authenticated user)
#[utoipa::path(
    get,
    path = "/vendors",
    tag = "vendors",
    summary = "List vendors",
    responses(
        (status = 200, description = "List of vendors", body = [VendorResponse]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_vendors(
    State(state): State<AppState>,
    _identity: AuthIdentity,
) -> Result<Json<ApiResponse<Vec<VendorResponse>>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut vendors = Vendors::new(&mut conn);
    let listed = vendors.list(&VendorFilter::new(0, 1000)).await?;

    Ok(Json(ApiResponse::ok(listed.into_iter().map(VendorResponse::from).collect())))
}

// POST /vendors - Create a vendor (admin or active vendor-edit window)
#[utoipa::path(
    post,
    path = "/vendors",
    tag = "vendors",
    summary = "Create a vendor",
    request_body = VendorCreate,
    responses(
        (status = 201, description = "Vendor created", body = VendorResponse),
        (status = 400, description = "Missing name or duplicate vendor"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin or an active vendor-edit window"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_vendor(
    State(state): State<AppState>,
    perm: RequiresPermission<resource::Vendors, operation::CreateAll>,
    Json(request): Json<VendorCreate>,
) -> Result<VendorCreatedResponse, Error> {
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::missing_field("name"))?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut vendors = Vendors::new(&mut conn);
    let created = vendors
        .create(&VendorCreateDBRequest {
            name: name.to_string(),
            contact: request.contact,
            notes: request.notes,
            updated_by: perm.identity.display_name.clone(),
        })
        .await
        .map_err(|e| {
            if e.is_unique_violation_on("name") {
                Error::BadRequest {
                    message: "A vendor with this name already exists".to_string(),
                }
            } else {
                Error::Database(e)
            }
        })?;

    Ok(VendorCreatedResponse {
        body: ApiResponse::ok(created.into()),
    })
}

// PUT /vendors/{id} - Update a vendor (admin or active vendor-edit window)
#[utoipa::path(
    put,
    path = "/vendors/{id}",
    tag = "vendors",
    summary = "Update a vendor",
    request_body = VendorUpdate,
    params(("id" = String, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Vendor updated", body = VendorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin or an active vendor-edit window"),
        (status = 404, description = "Vendor not found"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(vendor_id = %id))]
pub async fn update_vendor(
    State(state): State<AppState>,
    Path(id): Path<VendorId>,
    perm: RequiresPermission<resource::Vendors, operation::UpdateAll>,
    Json(request): Json<VendorUpdate>,
) -> Result<Json<ApiResponse<VendorResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut vendors = Vendors::new(&mut conn);

    let updated = vendors
        .update(
            id,
            &VendorUpdateDBRequest {
                name: request.name,
                contact: request.contact,
                notes: request.notes,
                updated_by: Some(perm.identity.display_name.clone()),
            },
        )
        .await
        .map_err(|e| match e {
            crate::db::errors::DbError::NotFound => Error::NotFound {
                resource: "vendor".to_string(),
                id: id.to_string(),
            },
            other => Error::Database(other),
        })?;

    Ok(Json(ApiResponse::ok(updated.into())))
}

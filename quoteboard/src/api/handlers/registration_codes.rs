use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    api::models::{
        ApiResponse,
        registration_codes::{ListCodesQuery, RegistrationCodeResponse},
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{handlers::RegistrationCodes, models::registration_codes::RegistrationCodeFilter},
    errors::Error,
    types::RegistrationCodeId,
};

/// Created-code response with a 201 status.
pub struct CodeCreatedResponse {
    body: ApiResponse<RegistrationCodeResponse>,
}

impl IntoResponse for CodeCreatedResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.body)).into_response()
    }
}

// POST /auth/registration-codes - Mint a single-use onboarding code (admin only)
#[utoipa::path(
    post,
    path = "/auth/registration-codes",
    tag = "registration-codes",
    summary = "Mint a single-use onboarding code",
    responses(
        (status = 201, description = "Code created", body = RegistrationCodeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 409, description = "Code generation attempts exhausted"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_code(
    State(state): State<AppState>,
    perm: RequiresPermission<resource::RegistrationCodes, operation::CreateAll>,
) -> Result<CodeCreatedResponse, Error> {
    let registration = &state.config.auth.registration;
    let ttl = chrono::Duration::from_std(registration.code_ttl).map_err(|e| Error::Internal {
        operation: format!("compute code expiry: {e}"),
    })?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut codes = RegistrationCodes::new(&mut conn);
    let code = codes
        .generate(
            &perm.identity.display_name,
            registration.code_length,
            ttl,
            registration.max_generation_attempts,
        )
        .await?
        .ok_or_else(|| Error::Conflict {
            message: "Exhausted registration code generation attempts".to_string(),
        })?;

    Ok(CodeCreatedResponse {
        body: ApiResponse::ok(code.into()),
    })
}

// GET /auth/registration-codes - List codes (admin only)
#[utoipa::path(
    get,
    path = "/auth/registration-codes",
    tag = "registration-codes",
    summary = "List onboarding codes",
    params(ListCodesQuery),
    responses(
        (status = 200, description = "List of codes", body = [RegistrationCodeResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_codes(
    State(state): State<AppState>,
    Query(query): Query<ListCodesQuery>,
    _: RequiresPermission<resource::RegistrationCodes, operation::ReadAll>,
) -> Result<Json<ApiResponse<Vec<RegistrationCodeResponse>>>, Error> {
    let filter = RegistrationCodeFilter {
        active_only: query.active.unwrap_or(false),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut codes = RegistrationCodes::new(&mut conn);
    let listed = codes.list(&filter).await?;

    Ok(Json(ApiResponse::ok(
        listed.into_iter().map(RegistrationCodeResponse::from).collect(),
    )))
}

// DELETE /auth/registration-codes/{id} - Remove a code (admin only)
#[utoipa::path(
    delete,
    path = "/auth/registration-codes/{id}",
    tag = "registration-codes",
    summary = "Delete an onboarding code",
    params(("id" = String, Path, description = "Code ID")),
    responses(
        (status = 200, description = "Code deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Code not found"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(code_id = %id))]
pub async fn delete_code(
    State(state): State<AppState>,
    Path(id): Path<RegistrationCodeId>,
    _: RequiresPermission<resource::RegistrationCodes, operation::DeleteAll>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut codes = RegistrationCodes::new(&mut conn);

    let deleted = codes.delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "registration code".to_string(),
            id: id.to_string(),
        });
    }

    Ok(Json(ApiResponse::message("Registration code deleted")))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::Role;
    use crate::test_utils::{create_test_app, create_test_user, login_token};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_create_list_delete_code_round_trip(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin, "adminpw12").await;
        let admin_token = login_token(&server, &admin.username, "adminpw12").await;

        let created = server
            .post("/auth/registration-codes")
            .add_header("authorization", format!("Bearer {admin_token}"))
            .await;
        created.assert_status(StatusCode::CREATED);
        let body: Value = created.json();
        let code_id = body["data"]["id"].as_str().unwrap().to_string();
        let code_value = body["data"]["code"].as_str().unwrap().to_string();
        assert_eq!(code_value.len(), 8);
        assert_eq!(body["data"]["isUsed"], json!(false));

        let listed = server
            .get("/auth/registration-codes?active=true")
            .add_header("authorization", format!("Bearer {admin_token}"))
            .await;
        listed.assert_status_ok();
        let body: Value = listed.json();
        assert!(
            body["data"]
                .as_array()
                .unwrap()
                .iter()
                .any(|c| c["code"] == json!(code_value))
        );

        let deleted = server
            .delete(&format!("/auth/registration-codes/{code_id}"))
            .add_header("authorization", format!("Bearer {admin_token}"))
            .await;
        deleted.assert_status_ok();

        let deleted_again = server
            .delete(&format!("/auth/registration-codes/{code_id}"))
            .add_header("authorization", format!("Bearer {admin_token}"))
            .await;
        deleted_again.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_codes_are_admin_only(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;
        let user_token = login_token(&server, &user.username, "pw123456").await;

        let response = server
            .post("/auth/registration-codes")
            .add_header("authorization", format!("Bearer {user_token}"))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server
            .get("/auth/registration-codes")
            .add_header("authorization", format!("Bearer {user_token}"))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn test_active_filter_hides_used_and_expired(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin, "adminpw12").await;
        let admin_token = login_token(&server, &admin.username, "adminpw12").await;

        sqlx::query(
            "INSERT INTO registration_codes (id, code, is_used, expires_at, created_by)
             VALUES ($1, 'USEDCODE', TRUE, NOW() + INTERVAL '1 day', 'admin'),
                    ($2, 'STALE999', FALSE, NOW() - INTERVAL '1 hour', 'admin')",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(uuid::Uuid::new_v4())
        .execute(&pool)
        .await
        .unwrap();

        let listed = server
            .get("/auth/registration-codes?active=true")
            .add_header("authorization", format!("Bearer {admin_token}"))
            .await;
        listed.assert_status_ok();
        let body: Value = listed.json();
        let codes = body["data"].as_array().unwrap();
        assert!(!codes.iter().any(|c| c["code"] == json!("USEDCODE")));
        assert!(!codes.iter().any(|c| c["code"] == json!("STALE999")));

        // Without the filter both still show for housekeeping
        let all = server
            .get("/auth/registration-codes")
            .add_header("authorization", format!("Bearer {admin_token}"))
            .await;
        let body: Value = all.json();
        let codes = body["data"].as_array().unwrap();
        assert!(codes.iter().any(|c| c["code"] == json!("USEDCODE")));
        assert!(codes.iter().any(|c| c["code"] == json!("STALE999")));
    }
}

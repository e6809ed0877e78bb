use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{ApiResponse, status::BannerStatus},
    config::Banner,
    errors::Error,
};

fn banner_status(banner: &Banner) -> BannerStatus {
    BannerStatus {
        enabled: banner.enabled,
        message: banner.message.clone(),
    }
}

// GET /status/maintenance - public read-only banner polling
#[utoipa::path(
    get,
    path = "/status/maintenance",
    tag = "status",
    summary = "Maintenance banner state",
    responses((status = 200, description = "Current maintenance banner", body = BannerStatus))
)]
#[tracing::instrument(skip_all)]
pub async fn get_maintenance(State(state): State<AppState>) -> Result<Json<ApiResponse<BannerStatus>>, Error> {
    Ok(Json(ApiResponse::ok(banner_status(&state.config.metadata.maintenance))))
}

// GET /status/announcement - public read-only banner polling
#[utoipa::path(
    get,
    path = "/status/announcement",
    tag = "status",
    summary = "Announcement banner state",
    responses((status = 200, description = "Current announcement banner", body = BannerStatus))
)]
#[tracing::instrument(skip_all)]
pub async fn get_announcement(State(state): State<AppState>) -> Result<Json<ApiResponse<BannerStatus>>, Error> {
    Ok(Json(ApiResponse::ok(banner_status(&state.config.metadata.announcement))))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::create_test_app;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_status_endpoints_are_public(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        // No Authorization header anywhere in sight
        let maintenance = server.get("/status/maintenance").await;
        maintenance.assert_status_ok();
        let body: Value = maintenance.json();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["enabled"], json!(false));

        let announcement = server.get("/status/announcement").await;
        announcement.assert_status_ok();
    }
}

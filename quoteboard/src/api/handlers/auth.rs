use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    api::models::{
        ApiResponse,
        auth::{ChangePasswordRequest, LoginData, LoginRequest, RefreshData, RegisterRequest},
        users::{Role, UserResponse},
    },
    auth::{
        credentials,
        current_user::AuthIdentity,
        password,
        token::{self, TokenKind, VerifyError},
    },
    config::Config,
    db::{
        handlers::{RegistrationCodes, Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::{Error, FieldViolation},
};

/// Login response carrying the refresh cookie alongside the envelope.
pub struct LoginResponse {
    body: ApiResponse<LoginData>,
    cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::SET_COOKIE, self.cookie)], Json(self.body)).into_response()
    }
}

/// Registration response with a 201 status.
pub struct RegisterResponse {
    body: ApiResponse<UserResponse>,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.body)).into_response()
    }
}

/// Login with username and password
///
/// Verifies the credential (migrating legacy plaintext storage on success),
/// returns a short-lived access token, and sets the long-lived refresh cookie.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = LoginData),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    let mut fields = Vec::new();
    let username = require_field(&request.username, "username", &mut fields);
    let password = require_field(&request.password, "password", &mut fields);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(Error::Validation {
            message: "Missing required fields".to_string(),
            fields,
        });
    };

    let user = credentials::verify(&state.db, &state.config, username, password).await?;

    let identity = AuthIdentity::from(&user);
    let access_token = token::issue_access(&identity, &state.config)?;
    let refresh_token = token::issue_refresh(&identity, &state.config)?;

    let cookie = refresh_cookie(&refresh_token, &state.config);

    Ok(LoginResponse {
        body: ApiResponse::ok_with_message(
            LoginData {
                access_token,
                user: user.into(),
            },
            "Login successful",
        ),
        cookie,
    })
}

/// Mint a new access token from the refresh cookie
///
/// Takes no body; the refresh token rides only in the protected cookie set at
/// login. Verification is purely signature + expiry - there is no server-side
/// record of issued refresh tokens.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "New access token issued", body = RefreshData),
        (status = 401, description = "Refresh cookie missing, invalid, or expired"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<ApiResponse<RefreshData>>, Error> {
    let refresh_token = refresh_cookie_value(&headers, &state.config).ok_or(Error::Unauthenticated { message: None })?;

    let claims = token::verify(&refresh_token, TokenKind::Refresh, &state.config).map_err(|e| match e {
        VerifyError::Internal(operation) => Error::Internal { operation },
        VerifyError::Expired | VerifyError::Invalid => Error::Unauthenticated { message: None },
    })?;

    let identity = AuthIdentity::from(claims);
    let access_token = token::issue_access(&identity, &state.config)?;

    Ok(Json(ApiResponse::ok(RefreshData { access_token })))
}

/// Register a new user account with a single-use onboarding code
///
/// The code redemption and the user insert commit in one transaction; the
/// redemption itself is a conditional update, so a code can never be consumed
/// twice even under concurrent attempts.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "auth",
    responses(
        (status = 201, description = "User registered successfully", body = UserResponse),
        (status = 400, description = "Missing fields, weak password, invalid/expired code, or duplicate username"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    let mut fields = Vec::new();
    let username = require_field(&request.username, "username", &mut fields);
    let password = require_field(&request.password, "password", &mut fields);
    let display_name = require_field(&request.display_name, "displayName", &mut fields);
    let registration_code = require_field(&request.registration_code, "registrationCode", &mut fields);
    let (Some(username), Some(password), Some(display_name), Some(registration_code)) =
        (username, password, display_name, registration_code)
    else {
        return Err(Error::Validation {
            message: "Missing required fields".to_string(),
            fields,
        });
    };

    validate_password_strength(&state.config, password, "password")?;

    // Hash on a blocking thread before opening the transaction so the hold
    // time on the connection stays short.
    let password_hash = hash_password_blocking(&state.config, password).await?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let code = {
        let mut codes = RegistrationCodes::new(&mut tx);
        codes.redeem(registration_code, username).await?
    }
    .ok_or_else(|| Error::BadRequest {
        message: "Invalid or expired registration code".to_string(),
    })?;

    let created = {
        let mut users = Users::new(&mut tx);
        users
            .create(&UserCreateDBRequest {
                username: username.to_string(),
                credential: password_hash,
                display_name: display_name.to_string(),
                // Self-registration always yields a regular user
                role: Role::User,
                created_by: code.created_by.clone(),
            })
            .await
    }
    .map_err(|e| {
        if e.is_unique_violation_on("username") {
            Error::BadRequest {
                message: "This username is already taken".to_string(),
            }
        } else {
            Error::Database(e)
        }
    })?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(RegisterResponse {
        body: ApiResponse::ok_with_message(created.into(), "Registration successful"),
    })
}

/// Change the password of an active account
#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Password changed successfully"),
        (status = 400, description = "Missing fields or weak new password"),
        (status = 401, description = "Current password is incorrect"),
        (status = 404, description = "No such active user"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let mut fields = Vec::new();
    let username = require_field(&request.username, "username", &mut fields);
    let old_password = require_field(&request.old_password, "oldPassword", &mut fields);
    let new_password = require_field(&request.new_password, "newPassword", &mut fields);
    let (Some(username), Some(old_password), Some(new_password)) = (username, old_password, new_password) else {
        return Err(Error::Validation {
            message: "Missing required fields".to_string(),
            fields,
        });
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = {
        let mut users = Users::new(&mut conn);
        users.get_active_by_username(username).await?
    }
    .ok_or_else(|| Error::NotFound {
        resource: "user".to_string(),
        id: username.to_string(),
    })?;

    let old_password_valid = credentials::verify_user(&state.db, &state.config, &user, old_password).await?;
    if !old_password_valid {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    validate_password_strength(&state.config, new_password, "newPassword")?;

    let new_hash = hash_password_blocking(&state.config, new_password).await?;

    let mut users = Users::new(&mut conn);
    users.set_credential(user.id, &new_hash).await?;

    Ok(Json(ApiResponse::message("Password changed successfully")))
}

/// Trimmed, non-empty field value or a recorded violation.
fn require_field<'a>(value: &'a Option<String>, field: &str, fields: &mut Vec<FieldViolation>) -> Option<&'a str> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Some(v),
        None => {
            fields.push(FieldViolation::new(field, "is required"));
            None
        }
    }
}

/// Enforce configured password length bounds, reporting against `field`.
pub(crate) fn validate_password_strength(config: &Config, password: &str, field: &str) -> Result<(), Error> {
    let rules = &config.auth.password;
    if password.len() < rules.min_length {
        return Err(Error::Validation {
            message: format!("Password must be at least {} characters", rules.min_length),
            fields: vec![FieldViolation::new(field, format!("must be at least {} characters", rules.min_length))],
        });
    }
    if password.len() > rules.max_length {
        return Err(Error::Validation {
            message: format!("Password must be no more than {} characters", rules.max_length),
            fields: vec![FieldViolation::new(field, format!("must be no more than {} characters", rules.max_length))],
        });
    }
    Ok(())
}

/// Hash a password on a blocking thread with the configured cost.
pub(crate) async fn hash_password_blocking(config: &Config, password: &str) -> Result<String, Error> {
    let params = config.argon2_params();
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || password::hash_password_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Build the refresh cookie set at login.
fn refresh_cookie(token: &str, config: &Config) -> String {
    let session = &config.auth.session;
    let max_age = config.auth.security.refresh_token_ttl.as_secs();

    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session.cookie_name, token, session.cookie_same_site, max_age
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull the refresh token out of the Cookie header, if present.
fn refresh_cookie_value(headers: &HeaderMap, config: &Config) -> Option<String> {
    let cookie_name = &config.auth.session.cookie_name;
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name == cookie_name {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        create_test_app, create_test_config, create_test_user, create_test_user_with_credential, extract_refresh_cookie, login_token,
    };
    use axum::http::HeaderValue;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[test]
    fn test_refresh_cookie_format() {
        let config = create_test_config();
        let cookie = refresh_cookie("tok.en.value", &config);

        assert!(cookie.starts_with("quoteboard_refresh=tok.en.value;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=strict"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn test_refresh_cookie_secure_flag_follows_config() {
        let mut config = create_test_config();
        config.auth.session.cookie_secure = true;
        assert!(refresh_cookie("t", &config).ends_with("; Secure"));

        config.auth.session.cookie_secure = false;
        assert!(!refresh_cookie("t", &config).contains("Secure"));
    }

    #[test]
    fn test_refresh_cookie_value_parsing() {
        let config = create_test_config();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; quoteboard_refresh=the-token; trailing=x"),
        );
        assert_eq!(refresh_cookie_value(&headers, &config), Some("the-token".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(refresh_cookie_value(&headers, &config), None);
    }

    #[sqlx::test]
    async fn test_login_success_returns_token_and_cookie(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;

        let response = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "pw123456"}))
            .await;

        response.assert_status_ok();
        let cookie_header = response
            .headers()
            .get("set-cookie")
            .expect("refresh cookie should be set")
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie_header.starts_with("quoteboard_refresh="));
        assert!(cookie_header.contains("HttpOnly"));

        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        assert!(!body["data"]["accessToken"].as_str().unwrap().is_empty());
        assert_eq!(body["data"]["user"]["username"], json!(user.username));
        assert_eq!(body["data"]["user"]["role"], json!("user"));
        assert_eq!(body["data"]["user"]["capabilityWindow"]["enabled"], json!(false));
    }

    #[sqlx::test]
    async fn test_login_wrong_password_is_generic_401(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;

        let response = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "wrong-password"}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(false));
    }

    #[sqlx::test]
    async fn test_login_unknown_user_is_same_401(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server
            .post("/auth/login")
            .json(&json!({"username": "nobody", "password": "pw123456"}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_login_missing_fields_reports_violations(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server.post("/auth/login").json(&json!({"username": "alice"})).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["errors"][0]["field"], json!("password"));
    }

    #[sqlx::test]
    async fn test_login_migrates_legacy_plaintext_credential(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        // Stored credential is the raw password, as the old system left it
        let user = create_test_user_with_credential(&pool, Role::User, "pw123456").await;

        let response = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "pw123456"}))
            .await;
        response.assert_status_ok();

        // The rehash runs detached from the login request; wait for it to land
        let mut migrated = String::new();
        for _ in 0..100 {
            let stored: String = sqlx::query_scalar("SELECT credential FROM users WHERE id = $1")
                .bind(user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
            if stored != "pw123456" {
                migrated = stored;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        assert!(migrated.starts_with("$argon2"), "credential should be hashed, got: {migrated}");

        // Same password still works after migration
        let again = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "pw123456"}))
            .await;
        again.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_soft_deleted_user_cannot_login(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;

        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        let response = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "pw123456"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_refresh_returns_fresh_access_token(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;

        let login = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "pw123456"}))
            .await;
        login.assert_status_ok();

        // Send the refresh cookie back the way a browser would
        let cookie = extract_refresh_cookie(&login);
        let response = server.post("/auth/refresh").add_header("cookie", cookie).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(!body["data"]["accessToken"].as_str().unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_refresh_without_cookie_401(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let response = server.post("/auth/refresh").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_refresh_with_tampered_cookie_401(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server
            .post("/auth/refresh")
            .add_header("cookie", "quoteboard_refresh=not.a.real.token")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_refresh_rejects_access_token_in_cookie(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;

        let login = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "pw123456"}))
            .await;
        let body: Value = login.json();
        let access_token = body["data"]["accessToken"].as_str().unwrap().to_string();

        // An access token smuggled into the refresh cookie must not mint tokens
        let response = server
            .post("/auth/refresh")
            .add_header("cookie", format!("quoteboard_refresh={access_token}"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_register_with_valid_code(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin, "adminpw12").await;

        let mut conn = pool.acquire().await.unwrap();
        let code = RegistrationCodes::new(&mut conn)
            .generate(&admin.username, 8, chrono::Duration::hours(24), 5)
            .await
            .unwrap()
            .expect("code should generate");

        let response = server
            .post("/auth/register")
            .json(&json!({
                "username": "newcomer",
                "password": "pw123456",
                "displayName": "New Comer",
                "registrationCode": code.code,
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["role"], json!("user"));
        assert_eq!(body["data"]["createdBy"], json!(admin.username));

        // The code is now spent
        let spent: bool = sqlx::query_scalar("SELECT is_used FROM registration_codes WHERE id = $1")
            .bind(code.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(spent);
    }

    #[sqlx::test]
    async fn test_register_code_single_use(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin, "adminpw12").await;

        let mut conn = pool.acquire().await.unwrap();
        let code = RegistrationCodes::new(&mut conn)
            .generate(&admin.username, 8, chrono::Duration::hours(24), 5)
            .await
            .unwrap()
            .unwrap();

        let first = server
            .post("/auth/register")
            .json(&json!({
                "username": "first",
                "password": "pw123456",
                "displayName": "First",
                "registrationCode": code.code,
            }))
            .await;
        first.assert_status(StatusCode::CREATED);

        let second = server
            .post("/auth/register")
            .json(&json!({
                "username": "second",
                "password": "pw123456",
                "displayName": "Second",
                "registrationCode": code.code,
            }))
            .await;
        second.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_register_expired_code_rejected(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        // Unused but expired an hour ago (generated 25h before a 24h TTL check)
        sqlx::query(
            "INSERT INTO registration_codes (id, code, expires_at, created_by)
             VALUES ($1, 'EXPIRED1', NOW() - INTERVAL '1 hour', 'admin')",
        )
        .bind(uuid::Uuid::new_v4())
        .execute(&pool)
        .await
        .unwrap();

        let response = server
            .post("/auth/register")
            .json(&json!({
                "username": "latecomer",
                "password": "pw123456",
                "displayName": "Late Comer",
                "registrationCode": "EXPIRED1",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], json!("Invalid or expired registration code"));
    }

    #[sqlx::test]
    async fn test_register_duplicate_username_rejected_and_code_unspent(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let existing = create_test_user(&pool, Role::User, "pw123456").await;
        let admin = create_test_user(&pool, Role::Admin, "adminpw12").await;

        let mut conn = pool.acquire().await.unwrap();
        let code = RegistrationCodes::new(&mut conn)
            .generate(&admin.username, 8, chrono::Duration::hours(24), 5)
            .await
            .unwrap()
            .unwrap();

        let response = server
            .post("/auth/register")
            .json(&json!({
                "username": existing.username,
                "password": "pw123456",
                "displayName": "Copycat",
                "registrationCode": code.code,
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], json!("This username is already taken"));

        // The failed transaction must roll the redemption back
        let spent: bool = sqlx::query_scalar("SELECT is_used FROM registration_codes WHERE id = $1")
            .bind(code.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(!spent, "code must stay redeemable when registration rolls back");
    }

    #[sqlx::test]
    async fn test_register_weak_password_rejected(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server
            .post("/auth/register")
            .json(&json!({
                "username": "weakling",
                "password": "short",
                "displayName": "Weak Ling",
                "registrationCode": "WHATEVER",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_change_password_requires_session(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;

        let response = server
            .post("/auth/change-password")
            .json(&json!({
                "username": user.username,
                "oldPassword": "pw123456",
                "newPassword": "brand-new-pw9",
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_change_password_flow(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;
        let token = login_token(&server, &user.username, "pw123456").await;

        let response = server
            .post("/auth/change-password")
            .add_header("authorization", format!("Bearer {token}"))
            .json(&json!({
                "username": user.username,
                "oldPassword": "pw123456",
                "newPassword": "brand-new-pw9",
            }))
            .await;
        response.assert_status_ok();

        // Old password no longer works, new one does
        let old_login = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "pw123456"}))
            .await;
        old_login.assert_status(StatusCode::UNAUTHORIZED);

        let new_login = server
            .post("/auth/login")
            .json(&json!({"username": user.username, "password": "brand-new-pw9"}))
            .await;
        new_login.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_change_password_wrong_old_password_401(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;
        let token = login_token(&server, &user.username, "pw123456").await;

        let response = server
            .post("/auth/change-password")
            .add_header("authorization", format!("Bearer {token}"))
            .json(&json!({
                "username": user.username,
                "oldPassword": "not-the-password",
                "newPassword": "brand-new-pw9",
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_change_password_unknown_user_404(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;
        let token = login_token(&server, &user.username, "pw123456").await;

        let response = server
            .post("/auth/change-password")
            .add_header("authorization", format!("Bearer {token}"))
            .json(&json!({
                "username": "ghost",
                "oldPassword": "pw123456",
                "newPassword": "brand-new-pw9",
            }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_change_password_weak_new_password_400(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User, "pw123456").await;
        let token = login_token(&server, &user.username, "pw123456").await;

        let response = server
            .post("/auth/change-password")
            .add_header("authorization", format!("Bearer {token}"))
            .json(&json!({
                "username": user.username,
                "oldPassword": "pw123456",
                "newPassword": "short",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

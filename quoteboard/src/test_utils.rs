//! Test utilities for integration testing (available with `test-utils` feature).

use axum_test::{TestResponse, TestServer};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    AppState,
    api::models::users::Role,
    auth::password,
    config::Config,
    db::{
        handlers::{Repository, Users, Vendors},
        models::{
            users::{UserCreateDBRequest, UserDBResponse},
            vendors::{VendorCreateDBRequest, VendorDBResponse},
        },
    },
};

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.secret_key = Some("test-secret-key-for-testing-only".to_string());
    config.admin_password = None;
    // Cheap hashing keeps the suite fast; verification reads params from the hash
    config.auth.password.argon2_memory_kib = 1024;
    config.auth.password.argon2_iterations = 1;
    config.auth.session.cookie_secure = false;
    config
}

/// Build an in-process test server over the given pool.
pub async fn create_test_app(pool: PgPool) -> TestServer {
    let config = create_test_config();
    let state = AppState::builder().db(pool).config(config).build();
    let router = crate::build_router(&state).await.expect("Failed to build router");

    TestServer::new(router).expect("Failed to create test server")
}

/// Pull the `name=value` pair of the refresh cookie out of a login response,
/// ready to be sent back in a `Cookie` header.
pub fn extract_refresh_cookie(response: &TestResponse) -> String {
    let header = response
        .headers()
        .get("set-cookie")
        .expect("response should set the refresh cookie")
        .to_str()
        .expect("cookie header should be valid UTF-8");
    header.split(';').next().expect("cookie should have a name=value pair").to_string()
}

/// Create a user whose credential is stored exactly as given. Passing a raw
/// password simulates a pre-migration legacy record.
pub async fn create_test_user_with_credential(pool: &PgPool, role: Role, credential: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users = Users::new(&mut conn);

    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("testuser_{}", &suffix[..8]);

    users
        .create(&UserCreateDBRequest {
            username,
            credential: credential.to_string(),
            display_name: "Test User".to_string(),
            role,
            created_by: "test".to_string(),
        })
        .await
        .expect("Failed to create test user")
}

/// Create a user with a properly hashed password.
pub async fn create_test_user(pool: &PgPool, role: Role, password_value: &str) -> UserDBResponse {
    let params = create_test_config().argon2_params();
    let credential = password::hash_password_with_params(password_value, Some(params)).expect("Failed to hash test password");
    create_test_user_with_credential(pool, role, &credential).await
}

pub async fn create_test_vendor(pool: &PgPool, name: &str) -> VendorDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut vendors = Vendors::new(&mut conn);

    vendors
        .create(&VendorCreateDBRequest {
            name: name.to_string(),
            contact: Some("sales@example.com".to_string()),
            notes: None,
            updated_by: "test".to_string(),
        })
        .await
        .expect("Failed to create test vendor")
}

/// Log in through the HTTP surface and return the access token.
pub async fn login_token(server: &TestServer, username: &str, password_value: &str) -> String {
    let response = server
        .post("/auth/login")
        .json(&serde_json::json!({"username": username, "password": password_value}))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    body["data"]["accessToken"]
        .as_str()
        .expect("login response should carry an access token")
        .to_string()
}

//! # quoteboard: quotation & vendor management backend
//!
//! `quoteboard` is the backend of a document-store application for vendor
//! quotations. Most of the product surface is ordinary CRUD; the part this
//! crate is built around is the **session, authorization, and
//! delegated-capability core**: credential verification with lazy
//! password-hash migration, stateless access/refresh token issuance,
//! role-based gating, single-use onboarding codes, and admin-granted
//! temporary vendor-edit permissions.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for persistence.
//!
//! ### Request Flow
//!
//! Every request passes through the session middleware
//! ([`auth::middleware::require_session`]). Public paths (login, register,
//! refresh, health, status polling) pass straight through; everything else
//! needs a bearer access token, which the middleware verifies and turns into
//! a typed [`auth::current_user::AuthIdentity`] attached to the request.
//! Handlers declare their authorization requirement with the
//! [`auth::permissions::RequiresPermission`] extractor, so every role and
//! capability decision evaluates in one place.
//!
//! Login verifies the credential through [`auth::credentials`] - migrating
//! legacy plaintext storage to Argon2id on first successful use - and issues
//! two JWTs: a ~20 minute access token returned in the body and a 7 day
//! refresh token set as an `HttpOnly; SameSite=Strict` cookie. When the
//! access token expires, clients call `POST /auth/refresh` (cookie only) and
//! retry once; [`client::ApiClient`] implements that dance with single-flight
//! coalescing for programmatic consumers.
//!
//! ### Core Components
//!
//! - [`api`]: route handlers and wire models (uniform `{success, message,
//!   data, errors}` envelope)
//! - [`auth`]: credentials, tokens, session middleware, permission rules
//! - [`db`]: repository-pattern data access over SQLx/PostgreSQL
//! - [`client`]: the client-side session manager
//! - [`config`]: YAML + environment configuration via figment
//! - [`telemetry`]: tracing with optional OTLP export
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use quoteboard::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = quoteboard::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     quoteboard::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use bon::Builder;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    api::handlers,
    api::models::users::Role,
    auth::{middleware::require_session, password},
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    openapi::ApiDoc,
};

pub use config::Config;
pub use types::{RegistrationCodeId, UserId, VendorId};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the quoteboard database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: creates the admin on first startup, updates the credential on
/// later startups when a password is configured. Without a configured
/// password no account is created, since credentials are mandatory.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(username: &str, password: Option<&str>, db: &PgPool) -> errors::Result<Option<UserId>> {
    let credential = match password {
        Some(pwd) => password::hash_password(pwd)?,
        None => {
            warn!("admin_password is not configured; skipping initial admin bootstrap");
            return Ok(None);
        }
    };

    let mut tx = db.begin().await.map_err(|e| errors::Error::Database(e.into()))?;
    let mut users = Users::new(&mut tx);

    if let Some(existing) = users.get_active_by_username(username).await? {
        users.set_credential(existing.id, &credential).await?;
        tx.commit().await.map_err(|e| errors::Error::Database(e.into()))?;
        return Ok(Some(existing.id));
    }

    let created = users
        .create(&UserCreateDBRequest {
            username: username.to_string(),
            credential,
            display_name: username.to_string(),
            role: Role::Admin,
            created_by: "system".to_string(),
        })
        .await?;

    tx.commit().await.map_err(|e| errors::Error::Database(e.into()))?;
    Ok(Some(created.id))
}

/// Create the CORS layer from configuration.
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let mut origins = Vec::new();
    for origin in &cors_config.allowed_origins {
        origins.push(origin.parse::<axum::http::HeaderValue>()?);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(cors_config.allow_credentials)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// The session middleware wraps the whole surface; its whitelist decides
/// which paths stay reachable without a token.
#[instrument(skip_all)]
pub async fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        // Session surface
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/change-password", post(handlers::auth::change_password))
        // User administration (admin only)
        .route("/auth/users", get(handlers::users::list_users))
        .route("/auth/users/{id}", delete(handlers::users::delete_user))
        .route("/auth/users/{id}/reset-password", put(handlers::users::reset_password))
        .route(
            "/auth/registration-codes",
            post(handlers::registration_codes::create_code).get(handlers::registration_codes::list_codes),
        )
        .route(
            "/auth/registration-codes/{id}",
            delete(handlers::registration_codes::delete_code),
        )
        // Delegated capability grants
        .route("/users/{id}/vendor-edit", post(handlers::users::grant_vendor_edit))
        // Vendor surface consuming the capability policy
        .route(
            "/vendors",
            get(handlers::vendors::list_vendors).post(handlers::vendors::create_vendor),
        )
        .route("/vendors/{id}", put(handlers::vendors::update_vendor))
        // Public read-only banner polling
        .route("/status/maintenance", get(handlers::status::get_maintenance))
        .route("/status/announcement", get(handlers::status::get_announcement))
        .merge(Scalar::with_url("/admin/docs", ApiDoc::openapi()))
        .layer(from_fn_with_state(state.clone(), require_session))
        .with_state(state.clone());

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, bootstraps the initial admin, and builds the router.
/// 2. **Serve**: [`Application::serve`] binds the TCP port and handles
///    requests until the shutdown future resolves.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;

        Self::new_with_pool(config, pool).await
    }

    /// Create an application over an existing pool (used by tests).
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;

        create_initial_admin_user(&config.admin_username, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("failed to create initial admin user: {e}"))?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&state).await?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("quoteboard listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

//! Credential verification with lazy hash migration.
//!
//! The store may hold two credential forms: canonical Argon2id PHC strings
//! and, transitionally, legacy plaintext passwords imported from the old
//! system. Verification accepts both. A successful login against a plaintext
//! credential schedules a detached rehash-and-persist task; its failure is
//! logged and never surfaces to the login that triggered it, so the upgrade
//! path is strictly best-effort.
//!
//! Argon2 work always runs on `spawn_blocking` so an expensive hash cannot
//! stall unrelated requests on the async runtime.

use sqlx::PgPool;
use tracing::instrument;

use crate::{
    auth::password::{self, Argon2Params, CredentialKind},
    config::Config,
    db::{handlers::Users, models::users::UserDBResponse},
    errors::{Error, Result},
    types::{UserId, abbrev_uuid},
};

/// Look up an active user by username and verify the password.
///
/// Absent users, deactivated accounts, and wrong passwords all collapse into
/// the same generic `Unauthenticated` error so the endpoint cannot be used as
/// a username oracle.
#[instrument(skip(pool, config, password), err)]
pub async fn verify(pool: &PgPool, config: &Config, username: &str, password: &str) -> Result<UserDBResponse> {
    let mut conn = pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = {
        let mut users = Users::new(&mut conn);
        users.get_active_by_username(username).await?
    }
    .ok_or_else(invalid_credentials)?;

    if verify_user(pool, config, &user, password).await? {
        Ok(user)
    } else {
        Err(invalid_credentials())
    }
}

/// Verify a password against an already-loaded user record.
///
/// Returns `Ok(true)` on match. A match against a legacy plaintext credential
/// additionally schedules the opportunistic migration to hashed form.
pub async fn verify_user(pool: &PgPool, config: &Config, user: &UserDBResponse, password: &str) -> Result<bool> {
    match password::credential_kind(&user.credential) {
        CredentialKind::Hashed => {
            let candidate = password.to_owned();
            let hash = user.credential.clone();
            tokio::task::spawn_blocking(move || password::verify_password(&candidate, &hash))
                .await
                .map_err(|e| Error::Internal {
                    operation: format!("spawn password verification task: {e}"),
                })?
        }
        CredentialKind::LegacyPlaintext => {
            if user.credential == password {
                spawn_credential_migration(pool.clone(), config.argon2_params(), user.id, password.to_owned());
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }
}

/// Rehash a legacy plaintext credential and persist it, off the login path.
fn spawn_credential_migration(pool: PgPool, params: Argon2Params, user_id: UserId, password: String) {
    tokio::spawn(async move {
        let hash = match tokio::task::spawn_blocking(move || password::hash_password_with_params(&password, Some(params))).await {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %abbrev_uuid(&user_id), "legacy credential migration failed to hash: {e}");
                return;
            }
            Err(e) => {
                tracing::warn!(user_id = %abbrev_uuid(&user_id), "legacy credential migration task panicked: {e}");
                return;
            }
        };

        let mut conn = match pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(user_id = %abbrev_uuid(&user_id), "legacy credential migration failed to acquire connection: {e}");
                return;
            }
        };

        let mut users = Users::new(&mut conn);
        match users.set_credential(user_id, &hash).await {
            Ok(true) => {
                tracing::info!(user_id = %abbrev_uuid(&user_id), "migrated legacy credential to hashed form");
            }
            Ok(false) => {
                tracing::warn!(user_id = %abbrev_uuid(&user_id), "legacy credential migration found no active user to update");
            }
            Err(e) => {
                tracing::warn!(user_id = %abbrev_uuid(&user_id), "legacy credential migration failed to persist: {e}");
            }
        }
    });
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid username or password".to_string()),
    }
}

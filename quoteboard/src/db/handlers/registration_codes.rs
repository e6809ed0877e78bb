//! Database repository for registration codes.
//!
//! Codes are immutable once minted; the only state transition is redemption,
//! which is a single conditional UPDATE so a code can never be consumed twice
//! even under concurrent attempts. That dedicated transition is why this
//! repository does not implement the generic [`crate::db::handlers::Repository`]
//! update surface.

use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::{
        errors::{DbError, Result},
        models::registration_codes::{RegistrationCodeDBResponse, RegistrationCodeFilter},
    },
    types::{RegistrationCodeId, abbrev_uuid},
};

/// Unambiguous uppercase alphabet for onboarding codes (no I/O/0/1).
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate one candidate code of the given length.
fn random_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

pub struct RegistrationCodes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RegistrationCodes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Mint a new single-use code, retrying on collision against existing
    /// codes up to `max_attempts`. Returns None when every attempt collided.
    #[instrument(skip(self), err)]
    pub async fn generate(
        &mut self,
        created_by: &str,
        code_length: usize,
        ttl: chrono::Duration,
        max_attempts: u32,
    ) -> Result<Option<RegistrationCodeDBResponse>> {
        let expires_at = Utc::now() + ttl;

        for attempt in 0..max_attempts {
            let code = random_code(code_length);
            match self.insert(&code, expires_at, created_by).await {
                Ok(created) => return Ok(Some(created)),
                Err(DbError::UniqueViolation { .. }) => {
                    tracing::debug!(attempt, "registration code collision, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    async fn insert(&mut self, code: &str, expires_at: DateTime<Utc>, created_by: &str) -> Result<RegistrationCodeDBResponse> {
        let created = sqlx::query_as::<_, RegistrationCodeDBResponse>(
            "INSERT INTO registration_codes (id, code, expires_at, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING id, code, is_used, used_by, used_at, expires_at, created_by, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(expires_at)
        .bind(created_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(created)
    }

    /// Atomically redeem a code for the given username. The compare-and-swap
    /// on `is_used` makes the at-most-once invariant hold without a separate
    /// read-then-save sequence; None means the code is unknown, already used,
    /// or expired.
    #[instrument(skip(self, code), err)]
    pub async fn redeem(&mut self, code: &str, username: &str) -> Result<Option<RegistrationCodeDBResponse>> {
        let redeemed = sqlx::query_as::<_, RegistrationCodeDBResponse>(
            "UPDATE registration_codes
             SET is_used = TRUE, used_by = $2, used_at = NOW()
             WHERE code = $1 AND is_used = FALSE AND expires_at > NOW()
             RETURNING id, code, is_used, used_by, used_at, expires_at, created_by, created_at",
        )
        .bind(code)
        .bind(username)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(redeemed)
    }

    #[instrument(skip(self), fields(code_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: RegistrationCodeId) -> Result<Option<RegistrationCodeDBResponse>> {
        let code = sqlx::query_as::<_, RegistrationCodeDBResponse>(
            "SELECT id, code, is_used, used_by, used_at, expires_at, created_by, created_at
             FROM registration_codes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(code)
    }

    #[instrument(skip(self, filter), fields(active_only = filter.active_only), err)]
    pub async fn list(&mut self, filter: &RegistrationCodeFilter) -> Result<Vec<RegistrationCodeDBResponse>> {
        let query = if filter.active_only {
            "SELECT id, code, is_used, used_by, used_at, expires_at, created_by, created_at
             FROM registration_codes
             WHERE is_used = FALSE AND expires_at > NOW()
             ORDER BY created_at DESC"
        } else {
            "SELECT id, code, is_used, used_by, used_at, expires_at, created_by, created_at
             FROM registration_codes
             ORDER BY created_at DESC"
        };

        let codes = sqlx::query_as::<_, RegistrationCodeDBResponse>(query)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(codes)
    }

    #[instrument(skip(self), fields(code_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: RegistrationCodeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM registration_codes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_code_length_and_charset() {
        for length in [6, 8, 12] {
            let code = random_code(length);
            assert_eq!(code.len(), length);
            assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)), "unexpected char in {code}");
        }
    }

    #[test]
    fn test_random_codes_differ() {
        // 32^12 combinations: a collision here means the generator is broken
        let a = random_code(12);
        let b = random_code(12);
        assert_ne!(a, b);
    }
}

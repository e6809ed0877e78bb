//! Database repository for vendors.

use crate::types::{VendorId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::vendors::{VendorCreateDBRequest, VendorDBResponse, VendorUpdateDBRequest},
};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing vendors
#[derive(Debug, Clone)]
pub struct VendorFilter {
    pub skip: i64,
    pub limit: i64,
}

impl VendorFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

pub struct Vendors<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Vendors<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Vendors<'c> {
    type CreateRequest = VendorCreateDBRequest;
    type UpdateRequest = VendorUpdateDBRequest;
    type Response = VendorDBResponse;
    type Id = VendorId;
    type Filter = VendorFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let vendor = sqlx::query_as::<_, VendorDBResponse>(
            "INSERT INTO vendors (id, name, contact, notes, updated_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, contact, notes, updated_by, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.contact)
        .bind(&request.notes)
        .bind(&request.updated_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(vendor)
    }

    #[instrument(skip(self), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let vendor = sqlx::query_as::<_, VendorDBResponse>(
            "SELECT id, name, contact, notes, updated_by, created_at, updated_at FROM vendors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(vendor)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let vendors = sqlx::query_as::<_, VendorDBResponse>(
            "SELECT id, name, contact, notes, updated_by, created_at, updated_at
             FROM vendors ORDER BY name ASC LIMIT $1 OFFSET $2",
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(vendors)
    }

    #[instrument(skip(self), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vendors WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let vendor = sqlx::query_as::<_, VendorDBResponse>(
            "UPDATE vendors SET
                name = COALESCE($2, name),
                contact = COALESCE($3, contact),
                notes = COALESCE($4, notes),
                updated_by = COALESCE($5, updated_by),
                updated_at = NOW()
             WHERE id = $1
             RETURNING id, name, contact, notes, updated_by, created_at, updated_at",
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.contact)
        .bind(&request.notes)
        .bind(&request.updated_by)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(vendor)
    }
}

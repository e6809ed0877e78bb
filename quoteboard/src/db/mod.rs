//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern to provide clean abstractions over
//! database operations: each entity has a repository in [`handlers`] wrapping
//! the queries, record structs live in [`models`], and constraint violations
//! are translated into the [`errors::DbError`] taxonomy.
//!
//! Repositories operate on a `&mut PgConnection`, so they compose with either
//! a pooled connection (read paths) or a transaction (multi-statement writes
//! such as registration, where code redemption and user creation must commit
//! together):
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut users = Users::new(&mut tx);
//! let user = users.create(&create_request).await?;
//! tx.commit().await?;
//! ```
//!
//! Migrations live in the `migrations/` directory and are embedded via
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;

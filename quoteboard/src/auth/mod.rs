//! Authentication and authorization system.
//!
//! This module implements the session core:
//! - Credential verification with lazy migration of legacy plaintext
//!   passwords to Argon2id ([`credentials`], [`password`])
//! - Stateless access/refresh token issuance and verification ([`token`])
//! - The per-request session gate with its public-path whitelist
//!   ([`middleware`])
//! - The typed authenticated identity handlers consume ([`current_user`])
//! - Declarative authorization rules, including the time-boxed vendor-edit
//!   capability window ([`permissions`])
//!
//! # Session model
//!
//! Login verifies the credential and issues two HS256 JWTs: a short-lived
//! access token returned in the response body, and a long-lived refresh token
//! set as an `HttpOnly; SameSite=Strict` cookie. Every authenticated request
//! carries the access token as a bearer header; when it expires the client
//! calls `/auth/refresh` (cookie only) to mint a new one and retries once.
//!
//! There is deliberately no server-side session store and no revocation
//! list: token validity is a pure function of signature and expiry, and
//! logout is client-local. A token issued before logout therefore remains
//! valid until its natural expiry.
//!
//! # Usage in handlers
//!
//! ```ignore
//! use quoteboard::auth::current_user::AuthIdentity;
//! use quoteboard::auth::permissions::{RequiresPermission, operation, resource};
//!
//! async fn any_authenticated(identity: AuthIdentity) { /* ... */ }
//!
//! async fn admin_only(
//!     perm: RequiresPermission<resource::Users, operation::ReadAll>,
//! ) { /* perm.identity is the verified caller */ }
//! ```

pub mod credentials;
pub mod current_user;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod token;

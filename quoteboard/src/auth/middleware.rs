//! Per-request session gate.
//!
//! Every inbound request passes through [`require_session`]. Public paths
//! (login, register, refresh, health) and public read-only status polling are
//! whitelisted; everything else must carry `Authorization: Bearer <access
//! token>`. On success a typed [`AuthIdentity`] is attached to the request
//! extensions for handlers and permission rules to consume. All failure modes
//! produce the same generic 401 so the gate never reveals whether a token was
//! missing, malformed, or expired.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::Response,
};
use tracing::trace;

use crate::{
    AppState,
    auth::{
        current_user::AuthIdentity,
        token::{self, TokenKind, VerifyError},
    },
    errors::Error,
};

/// Paths reachable without a session.
const PUBLIC_PATHS: &[&str] = &["/auth/login", "/auth/register", "/auth/refresh", "/healthz"];

/// Prefixes reachable without a session for read-only polling (maintenance
/// and announcement banners) and the rendered API docs.
const PUBLIC_READ_PREFIXES: &[&str] = &["/status/", "/admin/docs"];

pub(crate) fn is_public(method: &Method, path: &str) -> bool {
    if PUBLIC_PATHS.contains(&path) {
        return true;
    }
    (*method == Method::GET || *method == Method::HEAD) && PUBLIC_READ_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Session middleware applied to the whole router.
pub async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, Error> {
    let path = request.uri().path().to_owned();
    if is_public(request.method(), &path) {
        trace!(%path, "public path, skipping session check");
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers()).ok_or(Error::Unauthenticated { message: None })?;

    let claims = token::verify(token, TokenKind::Access, &state.config).map_err(|e| match e {
        VerifyError::Internal(operation) => Error::Internal { operation },
        // Expired and tampered tokens are indistinguishable to the caller
        VerifyError::Expired | VerifyError::Invalid => Error::Unauthenticated { message: None },
    })?;

    request.extensions_mut().insert(AuthIdentity::from(claims));

    Ok(next.run(request).await)
}

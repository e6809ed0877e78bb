//! Client-side session manager.
//!
//! [`ApiClient`] is the programmatic consumer of the auth surface: it holds
//! the current access token, attaches it to every request, and owns the
//! silent refresh-and-retry dance. The refresh cookie itself lives in the
//! underlying HTTP client's cookie store and never passes through this code.
//!
//! Session state is an explicit three-phase enum owned by one client
//! instance. Refresh is single-flight: concurrent 401s coalesce on one
//! in-flight refresh call through an async lock plus a token generation
//! counter, so a slow stale refresh can never overwrite a newer token, and
//! the logout transition fires exactly once no matter how many requests fail
//! together.
//!
//! ```text
//! Active --401--> Refreshing --success--> Active
//!                     \--failure--> LoggedOut   (terminal until next login)
//! ```

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::api::models::{
    ApiResponse,
    auth::{LoginData, RefreshData},
};

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Refreshing,
    LoggedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The one user-facing outcome of a failed refresh: sign in again.
    #[error("session expired, please sign in again")]
    SessionExpired,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error envelope.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub struct ApiClient {
    http: Client,
    base_url: Url,
    access_token: ArcSwapOption<String>,
    /// Bumped on every successful login/refresh; lets waiters detect that
    /// someone else already refreshed while they queued for the gate.
    token_generation: AtomicU64,
    refresh_gate: tokio::sync::Mutex<()>,
    phase: Mutex<SessionPhase>,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url,
            access_token: ArcSwapOption::const_empty(),
            token_generation: AtomicU64::new(0),
            refresh_gate: tokio::sync::Mutex::new(()),
            phase: Mutex::new(SessionPhase::LoggedOut),
        })
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().expect("session phase lock poisoned")
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.load_full().map(|token| token.as_ref().clone())
    }

    fn join(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Other(anyhow::anyhow!("invalid request path '{path}': {e}")))
    }

    /// Sign in. The refresh cookie lands in the cookie store; the access
    /// token is kept for the bearer header. A fresh login always resets the
    /// session phase, including after a logout.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginData, ClientError> {
        let url = self.join("auth/login")?;
        let response = self
            .http
            .post(url)
            .json(&json!({"username": username, "password": password}))
            .send()
            .await?;

        let data: LoginData = Self::parse(response).await?;

        self.access_token.store(Some(std::sync::Arc::new(data.access_token.clone())));
        self.token_generation.fetch_add(1, Ordering::SeqCst);
        *self.phase.lock().expect("session phase lock poisoned") = SessionPhase::Active;

        Ok(data)
    }

    /// Send an authenticated request, refreshing and replaying exactly once
    /// on 401. The closure rebuilds the request for the replay so bodies
    /// never need to be cloned.
    pub async fn send<F>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let seen_generation = self.token_generation.load(Ordering::SeqCst);

        let response = self.authorize(build(&self.http)).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // The only sanctioned recovery: one refresh, one replay.
        self.refresh_once(seen_generation).await?;

        let retry = self.authorize(build(&self.http)).send().await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            self.logout_once();
            return Err(ClientError::SessionExpired);
        }
        Ok(retry)
    }

    /// GET a path and unwrap the `data` payload of the envelope.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.join(path)?;
        let response = self.send(move |http| http.get(url.clone())).await?;
        Self::parse(response).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.access_token.load_full() {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }

    /// Single-flight refresh. Callers pass the token generation they started
    /// their request with; whoever wins the gate performs the real refresh
    /// and everyone queued behind reuses the result.
    async fn refresh_once(&self, seen_generation: u64) -> Result<(), ClientError> {
        let _guard = self.refresh_gate.lock().await;

        if self.token_generation.load(Ordering::SeqCst) != seen_generation {
            // Someone else refreshed while we waited; their token is newer
            // than the one we failed with.
            return Ok(());
        }

        if self.phase() == SessionPhase::LoggedOut {
            return Err(ClientError::SessionExpired);
        }

        *self.phase.lock().expect("session phase lock poisoned") = SessionPhase::Refreshing;

        let outcome: Result<RefreshData, ClientError> = async {
            let url = self.join("auth/refresh")?;
            let response = self.http.post(url).send().await?;
            Self::parse(response).await
        }
        .await;

        match outcome {
            Ok(data) => {
                self.access_token.store(Some(std::sync::Arc::new(data.access_token)));
                self.token_generation.fetch_add(1, Ordering::SeqCst);
                *self.phase.lock().expect("session phase lock poisoned") = SessionPhase::Active;
                tracing::debug!("access token refreshed");
                Ok(())
            }
            Err(e) => {
                tracing::debug!("refresh failed: {e}");
                self.logout_once();
                Err(ClientError::SessionExpired)
            }
        }
    }

    /// Transition to LoggedOut at most once: clear the token slot and emit
    /// the single user-facing notice.
    fn logout_once(&self) {
        let mut phase = self.phase.lock().expect("session phase lock poisoned");
        if *phase == SessionPhase::LoggedOut {
            return;
        }
        *phase = SessionPhase::LoggedOut;
        self.access_token.store(None);
        tracing::warn!("session expired; signed out locally");
    }

    /// Unwrap the response envelope, surfacing the server's message on error
    /// statuses.
    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiResponse<serde_json::Value>>()
                .await
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return Err(ClientError::Api { status, message });
        }

        let envelope: ApiResponse<T> = response.json().await?;
        envelope
            .data
            .ok_or_else(|| ClientError::Other(anyhow::anyhow!("response envelope missing data")))
    }
}

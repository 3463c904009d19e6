// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storefront REST client.
//!
//! Handles:
//! - Bearer credential attachment from the session store
//! - Transparent recovery from an expired access token (one refresh for
//!   any number of concurrently failing requests, one retry per request)
//! - Session teardown and a re-authentication signal when refresh fails
//! - Mapping responses into the [`ApiError`] taxonomy

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::user::RefreshResponse;
use crate::services::refresh::{RefreshCoordinator, RefreshOutcome, RefreshTicket};
use crate::store::SessionStore;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Token refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "auth/token/refresh/";

const EVENT_CAPACITY: usize = 16;

/// Session lifecycle notifications for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials are gone; send the user to `login_url`.
    ReauthenticationRequired { login_url: String },
    SignedIn { username: String },
    SignedOut,
}

/// A request that can be executed again for the single retry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body. Serialization failures are request-setup errors.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::RequestSetup(format!("Cannot encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

struct Inner {
    http: reqwest::Client,
    base_url: Url,
    login_path: String,
    session: SessionStore,
    refresh: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
    current_path: Mutex<String>,
}

/// Shared API client. Clones share credentials, refresh state and events.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(config: &Config, session: SessionStore) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            ApiError::RequestSetup(format!("Invalid API base URL {}: {}", config.api_base_url, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::RequestSetup(format!("Failed to build HTTP client: {}", e)))?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                login_path: config.login_path.clone(),
                session,
                refresh: RefreshCoordinator::new(),
                events,
                current_path: Mutex::new(String::new()),
            }),
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Record where the user is, so a forced login can send them back.
    pub fn set_current_path(&self, path: &str) {
        let mut current = self
            .inner
            .current_path
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = path.to_string();
    }

    /// Completed refresh cycles so far.
    pub fn refresh_cycles(&self) -> u64 {
        self.inner.refresh.generation()
    }

    /// Login URL carrying the current path as `next`.
    pub fn login_url(&self) -> String {
        let current = self
            .inner
            .current_path
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());

        if current.is_empty() || current.starts_with(&self.inner.login_path) {
            return self.inner.login_path.clone();
        }
        format!(
            "{}?next={}",
            self.inner.login_path,
            urlencoding::encode(&current)
        )
    }

    // ─── Convenience wrappers ────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(&ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(&ApiRequest::post(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(&ApiRequest::patch(path).json(body)?).await
    }

    // ─── Request pipeline ────────────────────────────────────────────────────

    /// Execute a request and decode its JSON body.
    ///
    /// An empty success body decodes as JSON `null` (so `()` works).
    pub async fn send<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let body = self.send_raw(request).await?;
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };

        serde_json::from_str(text).map_err(|e| ApiError::Server {
            status: 200,
            message: format!("Unexpected response from {}: {}", request.path, e),
        })
    }

    /// Execute a request and return the raw success body.
    pub async fn send_raw(&self, request: &ApiRequest) -> Result<String> {
        let generation = self.inner.refresh.generation();
        let token = self.inner.session.access_token()?;

        let response = self.execute(request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_body(response).await;
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            "Access token rejected, recovering session"
        );

        let token = self.recover_authorization(generation).await?;

        let retry = self.execute(request, Some(&token)).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                "Request still unauthorized after token refresh"
            );
            return Err(ApiError::Unauthorized);
        }
        read_body(retry).await
    }

    async fn execute(&self, request: &ApiRequest, token: Option<&str>) -> Result<reqwest::Response> {
        let url = self.url(&request.path)?;

        let mut builder = self.inner.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(ApiError::from)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::RequestSetup(format!("Invalid path {}: {}", path, e)))
    }

    // ─── Token refresh ───────────────────────────────────────────────────────

    /// Obtain a usable access token after a 401.
    ///
    /// `generation` is the refresh cycle count observed before the failing
    /// request was sent.
    async fn recover_authorization(&self, generation: u64) -> Result<String> {
        match self.inner.refresh.enter(generation) {
            RefreshTicket::AlreadyRefreshed => self
                .inner
                .session
                .access_token()?
                .ok_or(ApiError::SessionExpired),
            RefreshTicket::Waiter(rx) => {
                tracing::debug!("Token refresh in flight, queuing request");
                rx.await.unwrap_or(Err(ApiError::SessionExpired))
            }
            RefreshTicket::Leader(lease) => {
                tracing::info!("Access token expired, refreshing");

                let outcome = self.refresh_access_token().await;
                if outcome.is_err() {
                    self.end_session();
                }

                let released = lease.complete(&outcome);
                tracing::info!(
                    success = outcome.is_ok(),
                    released,
                    "Token refresh finished"
                );
                outcome
            }
        }
    }

    /// Exchange the refresh credential for a new access token.
    ///
    /// Goes straight to the HTTP client so a failure here can never start
    /// another refresh.
    async fn refresh_access_token(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.inner.session.refresh_token()? else {
            tracing::warn!("No refresh token stored, session cannot be renewed");
            return Err(ApiError::SessionExpired);
        };

        let url = self.url(REFRESH_PATH)?;
        let response = self
            .inner
            .http
            .post(url)
            .json(&serde_json::json!({ "refresh": refresh_token }))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Token refresh request failed");
                ApiError::SessionExpired
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Token refresh rejected");
            return Err(ApiError::SessionExpired);
        }

        let tokens: RefreshResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse token refresh response");
            ApiError::SessionExpired
        })?;

        self.inner.session.store_access_token(&tokens.access)?;
        if let Some(rotated) = tokens.refresh.as_deref() {
            self.inner.session.store_refresh_token(rotated)?;
        }

        Ok(tokens.access)
    }

    /// Terminal authorization failure: restore the pre-login visitor id,
    /// drop credentials and ask the UI to re-authenticate.
    fn end_session(&self) {
        let session = &self.inner.session;

        if let Err(e) = session.restore_archived_visitor_id() {
            tracing::warn!(error = %e, "Failed to restore archived visitor id");
        }
        if let Err(e) = session.clear_credentials() {
            tracing::error!(error = %e, "Failed to clear stored credentials");
        }

        let login_url = self.login_url();
        tracing::info!(login_url = %login_url, "Session ended, re-authentication required");
        self.emit(SessionEvent::ReauthenticationRequired { login_url });
    }
}

/// Success body, or the classified error for any other status.
async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(format!("Failed to read response body: {}", e)))?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(ApiError::from_response(status.as_u16(), &body))
    }
}

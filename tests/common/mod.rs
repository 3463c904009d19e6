// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storefront_client::config::Config;
use storefront_client::models::Coordinate;
use storefront_client::services::{GeolocationError, GeolocationProvider, PositionOptions};
use storefront_client::store::SessionStore;
use storefront_client::Storefront;

pub const FRESH_TOKEN: &str = "fresh-access";
pub const STALE_TOKEN: &str = "stale-access";

/// In-process stand-in for the storefront backend.
pub struct FakeBackend {
    valid_token: Mutex<String>,
    refresh_succeeds: AtomicBool,
    refresh_delay: Duration,
    pub refresh_calls: AtomicUsize,
    pub protected_calls: AtomicUsize,
    pub product_views: Mutex<Vec<Value>>,
    pub contact_messages: Mutex<Vec<Value>>,
}

impl FakeBackend {
    fn new(refresh_succeeds: bool) -> Self {
        Self {
            valid_token: Mutex::new(FRESH_TOKEN.to_string()),
            refresh_succeeds: AtomicBool::new(refresh_succeeds),
            refresh_delay: Duration::from_millis(100),
            refresh_calls: AtomicUsize::new(0),
            protected_calls: AtomicUsize::new(0),
            product_views: Mutex::new(Vec::new()),
            contact_messages: Mutex::new(Vec::new()),
        }
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_views(&self) -> Vec<Value> {
        self.product_views.lock().unwrap().clone()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

type Shared = State<Arc<FakeBackend>>;

async fn protected(State(backend): Shared, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    backend.protected_calls.fetch_add(1, Ordering::SeqCst);
    if backend.authorized(&headers) {
        (StatusCode::OK, Json(json!({"ok": true})))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Given token not valid for any token type"})),
        )
    }
}

async fn always_unauthorized(State(backend): Shared) -> (StatusCode, Json<Value>) {
    backend.protected_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "You do not have access"})),
    )
}

async fn refresh(State(backend): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(backend.refresh_delay).await;

    if !backend.refresh_succeeds.load(Ordering::SeqCst) || body["refresh"].as_str().is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        );
    }
    *backend.valid_token.lock().unwrap() = FRESH_TOKEN.to_string();
    (StatusCode::OK, Json(json!({"access": FRESH_TOKEN})))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] != "engine1843" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"non_field_errors": ["Invalid username/email or password."]})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "user": {
                "id": "u-1",
                "username": "ada",
                "email": "ada@example.com",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "visitor_id": "v-account"
            },
            "tokens": {"access": FRESH_TOKEN, "refresh": "refresh-1"}
        })),
    )
}

async fn request_code() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"email": ["A user with this email already exists."]})),
    )
}

async fn product_view(State(backend): Shared, Json(body): Json<Value>) -> Json<Value> {
    backend.product_views.lock().unwrap().push(body);
    Json(json!({"success": true, "duplicate": false}))
}

async fn contact_us(State(backend): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    backend.contact_messages.lock().unwrap().push(body.clone());
    let mut data = body;
    data["id"] = json!("c-1");
    data["created_at"] = json!("2026-10-19T08:00:00Z");
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Thank you for contacting us! We will get back to you soon.",
            "data": data
        })),
    )
}

async fn popular() -> Json<Value> {
    Json(json!({"results": [
        {"id": "p-1", "title": "Oak chair", "price": "120.00"}
    ]}))
}

/// Start the fake backend on an ephemeral port.
/// Returns its API base URL and the shared state.
pub async fn spawn_backend(refresh_succeeds: bool) -> (String, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend::new(refresh_succeeds));

    let app = Router::new()
        .route("/api/protected/", get(protected))
        .route("/api/always-401/", get(always_unauthorized))
        .route("/api/auth/token/refresh/", post(refresh))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/signup/request-code/", post(request_code))
        .route("/api/tracking/product-views/", post(product_view))
        .route("/api/tracking/popular-products/", get(popular))
        .route("/api/contact-us/", post(contact_us))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{}/api/", addr), backend)
}

/// A storefront client against `base_url` with an in-memory session.
#[allow(dead_code)]
pub fn test_client(
    base_url: &str,
    provider: Option<Arc<CountingProvider>>,
) -> (Storefront, SessionStore) {
    let provider = provider.map(|p| p as Arc<dyn GeolocationProvider>);
    let session = SessionStore::in_memory();
    let storefront = Storefront::new(&Config::for_base_url(base_url), session.clone(), provider)
        .expect("Failed to build client");
    (storefront, session)
}

/// Provider returning a canned result and counting how often it was asked.
pub struct CountingProvider {
    result: Result<Coordinate, GeolocationError>,
    delay: Duration,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl CountingProvider {
    pub fn at(latitude: f64, longitude: f64) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(Coordinate::new(latitude, longitude)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: GeolocationError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Never answers within a short timeout.
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            result: Ok(Coordinate::new(0.0, 0.0)),
            delay: Duration::from_secs(30),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeolocationProvider for CountingProvider {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

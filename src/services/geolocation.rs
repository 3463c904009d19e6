// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Consent-gated visitor location.
//!
//! The tracker asks the platform for a position at most once per load,
//! remembers the visitor's decision, and exposes `{status, location}` to
//! consumers. It never calls a tracking endpoint itself, and geolocation
//! failures never leave this module: they become the `Denied` state.

use crate::models::{ConsentDecision, ConsentStatus, Coordinate, LocationSnapshot};
use crate::store::SessionStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_secs(5 * 60);
const IP_LOOKUP_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Options passed to the one-shot position query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached platform fix that is still acceptable
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: false,
            timeout: DEFAULT_TIMEOUT,
            maximum_age: DEFAULT_MAXIMUM_AGE,
        }
    }
}

/// Geolocation failures (absorbed by [`LocationTracker`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Position unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out waiting for a position")]
    Timeout,
}

/// Platform capability: one-shot position query.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinate, GeolocationError>;
}

/// Startup pipeline and live status for the visitor's location.
pub struct LocationTracker {
    session: SessionStore,
    provider: Option<Arc<dyn GeolocationProvider>>,
    options: PositionOptions,
    state: watch::Sender<LocationSnapshot>,
    started: AtomicBool,
}

impl LocationTracker {
    /// `provider` is `None` when the runtime has no geolocation capability.
    pub fn new(session: SessionStore, provider: Option<Arc<dyn GeolocationProvider>>) -> Self {
        let (state, _) = watch::channel(LocationSnapshot::default());
        Self {
            session,
            provider,
            options: PositionOptions::default(),
            state,
            started: AtomicBool::new(false),
        }
    }

    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LocationSnapshot> {
        self.state.subscribe()
    }

    /// Run the startup sequence. Only the first call does anything; later
    /// calls return the current snapshot.
    pub async fn start(&self) -> LocationSnapshot {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.snapshot();
        }

        match self.session.consent_decision() {
            Ok(Some(ConsentDecision::Denied)) => {
                tracing::info!("Location consent previously denied, not prompting");
                self.publish(ConsentStatus::Denied, None);
                return self.snapshot();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read stored consent decision"),
        }

        let Some(provider) = self.provider.clone() else {
            tracing::debug!("No geolocation capability, location tracking disabled");
            return self.snapshot();
        };

        self.publish(ConsentStatus::Requesting, None);

        let result = tokio::time::timeout(
            self.options.timeout,
            provider.current_position(&self.options),
        )
        .await
        .unwrap_or(Err(GeolocationError::Timeout))
        .and_then(|position| {
            if position.is_valid() {
                Ok(position)
            } else {
                Err(GeolocationError::Unavailable(format!(
                    "invalid coordinate {:?}",
                    position
                )))
            }
        });

        match result {
            Ok(position) => self.accept(position),
            Err(e) => self.deny(&e),
        }
        self.snapshot()
    }

    /// Wait until the status is granted or denied, running startup first if
    /// it has not run yet.
    ///
    /// Returns `None` when the status can never settle because the runtime
    /// has no geolocation capability.
    pub async fn settled(&self) -> Option<LocationSnapshot> {
        let snapshot = self.start().await;
        if snapshot.status.is_settled() {
            return Some(snapshot);
        }
        if !self.is_available() {
            return None;
        }

        let mut rx = self.state.subscribe();
        let settled = rx.wait_for(|s| s.status.is_settled()).await.ok()?;
        Some(*settled)
    }

    fn accept(&self, position: Coordinate) {
        let rounded = position.rounded();

        if let Err(e) = self.session.store_consent_decision(ConsentDecision::Granted) {
            tracing::warn!(error = %e, "Failed to persist location consent");
        }

        let previous = self.session.last_location().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring unreadable stored location");
            None
        });

        let current = match previous {
            Some(previous) if !previous.is_meaningful_change(&rounded) => {
                tracing::debug!("Location drift below threshold, keeping stored coordinate");
                previous
            }
            _ => {
                if let Err(e) = self.session.store_last_location(rounded) {
                    tracing::warn!(error = %e, "Failed to persist location");
                }
                tracing::info!(
                    latitude = rounded.latitude,
                    longitude = rounded.longitude,
                    "Visitor location updated"
                );
                rounded
            }
        };

        self.publish(ConsentStatus::Granted, Some(current));
    }

    fn deny(&self, error: &GeolocationError) {
        tracing::info!(reason = %error, "Location unavailable, recording consent as denied");

        if let Err(e) = self.session.store_consent_decision(ConsentDecision::Denied) {
            tracing::warn!(error = %e, "Failed to persist location consent");
        }
        self.publish(ConsentStatus::Denied, None);
    }

    fn publish(&self, status: ConsentStatus, location: Option<Coordinate>) {
        self.state.send_replace(LocationSnapshot { status, location });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────────────────────────────────────

/// A configured, fixed position.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

#[async_trait]
impl GeolocationProvider for FixedPosition {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        Ok(self.0)
    }
}

/// Approximate position from an IP geolocation service.
///
/// Expects a JSON object with `latitude`/`lat` and `longitude`/`lon`/`lng`.
/// Rate-limit and 5xx responses are retried once a second until the
/// timeout; fixes younger than `maximum_age` are served from cache.
pub struct IpGeolocation {
    http: reqwest::Client,
    endpoint: String,
    cache: Mutex<Option<(Coordinate, Instant)>>,
}

impl IpGeolocation {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            cache: Mutex::new(None),
        }
    }
}

#[async_trait]
impl GeolocationProvider for IpGeolocation {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        let mut cache = self.cache.lock().await;
        if let Some((position, fetched_at)) = *cache {
            if fetched_at.elapsed() <= options.maximum_age {
                return Ok(position);
            }
        }

        let deadline = Instant::now() + options.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(GeolocationError::Timeout);
            }

            let response = self
                .http
                .get(&self.endpoint)
                .timeout(remaining)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        GeolocationError::Timeout
                    } else {
                        GeolocationError::Unavailable(e.to_string())
                    }
                })?;

            let status = response.status().as_u16();
            if matches!(status, 429 | 500 | 502 | 503 | 504) {
                tracing::debug!(status, "IP geolocation busy, retrying");
                tokio::time::sleep(IP_LOOKUP_RETRY_DELAY.min(remaining)).await;
                continue;
            }
            if !response.status().is_success() {
                return Err(GeolocationError::Unavailable(format!("HTTP {}", status)));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| GeolocationError::Unavailable(format!("invalid JSON: {}", e)))?;

            let position = parse_ip_location(&body).ok_or_else(|| {
                GeolocationError::Unavailable("response has no coordinates".to_string())
            })?;

            *cache = Some((position, Instant::now()));
            return Ok(position);
        }
    }
}

fn parse_ip_location(body: &Value) -> Option<Coordinate> {
    let latitude = number_field(body, &["latitude", "lat"])?;
    let longitude = number_field(body, &["longitude", "lon", "lng"])?;
    Some(Coordinate::new(latitude, longitude))
}

fn number_field(body: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| match body.get(*name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

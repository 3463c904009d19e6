// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Storefront client: browse a product catalog, sign in, and report
//! visitor behavior to the storefront backend.
//!
//! This crate provides the REST client (with transparent access-token
//! refresh) and the consent-gated location pipeline that decides what
//! tracking data may be sent.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use config::Config;
use error::Result;
use services::{
    ApiClient, AuthService, CatalogService, FixedPosition, GeolocationProvider, IpGeolocation,
    LocationTracker, TrackingService,
};
use std::sync::Arc;
use store::{FileStore, SessionStore};

/// Shared client state.
#[derive(Clone)]
pub struct Storefront {
    pub api: ApiClient,
    pub location: Arc<LocationTracker>,
    pub auth: AuthService,
    pub catalog: CatalogService,
    pub tracking: TrackingService,
}

impl Storefront {
    /// Build a client persisting its session to `config.session_file`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = FileStore::open(&config.session_file)?;
        let session = SessionStore::new(Arc::new(store));
        Self::new(config, session, provider_for(config))
    }

    pub fn new(
        config: &Config,
        session: SessionStore,
        provider: Option<Arc<dyn GeolocationProvider>>,
    ) -> Result<Self> {
        let api = ApiClient::new(config, session.clone())?;
        let location = Arc::new(LocationTracker::new(session, provider));

        Ok(Self {
            auth: AuthService::new(api.clone()),
            catalog: CatalogService::new(api.clone(), config.search_debounce),
            tracking: TrackingService::new(api.clone(), location.clone()),
            api,
            location,
        })
    }
}

/// Geolocation capability from configuration: a fixed position wins over
/// an IP lookup; neither means the runtime has no capability.
pub fn provider_for(config: &Config) -> Option<Arc<dyn GeolocationProvider>> {
    if let Some((latitude, longitude)) = config.fixed_position {
        let position = models::Coordinate::new(latitude, longitude);
        return Some(Arc::new(FixedPosition(position)));
    }
    config
        .ip_geolocation_url
        .as_ref()
        .map(|url| Arc::new(IpGeolocation::new(url.clone())) as Arc<dyn GeolocationProvider>)
}

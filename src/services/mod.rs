// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - client logic layer.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod debounce;
pub mod geolocation;
pub mod refresh;
pub mod tracking;

pub use api::{ApiClient, ApiRequest, SessionEvent};
pub use auth::AuthService;
pub use catalog::{CatalogService, ProductQuery, SearchResult};
pub use debounce::{Debouncer, Superseded};
pub use geolocation::{
    FixedPosition, GeolocationError, GeolocationProvider, IpGeolocation, LocationTracker,
    PositionOptions,
};
pub use refresh::RefreshCoordinator;
pub use tracking::{Gated, SkipReason, TrackOutcome, TrackingService};

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location consent pipeline.

use std::sync::Arc;
use std::time::Duration;
use storefront_client::models::{ConsentDecision, ConsentStatus, Coordinate};
use storefront_client::services::{
    GeolocationError, GeolocationProvider, LocationTracker, PositionOptions,
};
use storefront_client::store::SessionStore;

mod common;
use common::CountingProvider;

fn tracker(session: &SessionStore, provider: &Arc<CountingProvider>) -> LocationTracker {
    let provider: Arc<dyn GeolocationProvider> = provider.clone();
    LocationTracker::new(session.clone(), Some(provider))
}

#[tokio::test]
async fn test_persisted_denial_never_prompts() {
    let session = SessionStore::in_memory();
    session
        .store_consent_decision(ConsentDecision::Denied)
        .unwrap();
    let provider = CountingProvider::at(37.7749, -122.4194);

    let snapshot = tracker(&session, &provider).start().await;

    assert_eq!(snapshot.status, ConsentStatus::Denied);
    assert_eq!(snapshot.location, None);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_grant_rounds_and_persists() {
    let session = SessionStore::in_memory();
    let provider = CountingProvider::at(37.774929, -122.419416);

    let snapshot = tracker(&session, &provider).start().await;

    let expected = Coordinate::new(37.7749, -122.4194);
    assert_eq!(snapshot.status, ConsentStatus::Granted);
    assert_eq!(snapshot.location, Some(expected));
    assert_eq!(
        session.consent_decision().unwrap(),
        Some(ConsentDecision::Granted)
    );
    assert_eq!(session.last_location().unwrap(), Some(expected));
}

#[tokio::test]
async fn test_small_drift_keeps_stored_coordinate() {
    let session = SessionStore::in_memory();
    let stored = Coordinate::new(37.7749, -122.4194);
    session.store_last_location(stored).unwrap();

    // Exactly 0.01 on latitude is not a meaningful change.
    let provider = CountingProvider::at(37.7849, -122.4194);
    let snapshot = tracker(&session, &provider).start().await;

    assert_eq!(snapshot.location, Some(stored));
    assert_eq!(session.last_location().unwrap(), Some(stored));
}

#[tokio::test]
async fn test_large_move_replaces_stored_coordinate() {
    let session = SessionStore::in_memory();
    session
        .store_last_location(Coordinate::new(37.7749, -122.4194))
        .unwrap();

    let provider = CountingProvider::at(37.7749, -122.4395);
    let snapshot = tracker(&session, &provider).start().await;

    let moved = Coordinate::new(37.7749, -122.4395);
    assert_eq!(snapshot.location, Some(moved));
    assert_eq!(session.last_location().unwrap(), Some(moved));
}

#[tokio::test]
async fn test_provider_error_becomes_persisted_denial() {
    let session = SessionStore::in_memory();
    let provider = CountingProvider::failing(GeolocationError::PermissionDenied);

    let snapshot = tracker(&session, &provider).start().await;
    assert_eq!(snapshot.status, ConsentStatus::Denied);
    assert_eq!(
        session.consent_decision().unwrap(),
        Some(ConsentDecision::Denied)
    );

    // Next load does not ask again.
    let again = CountingProvider::at(1.0, 1.0);
    tracker(&session, &again).start().await;
    assert_eq!(again.call_count(), 0);
}

#[tokio::test]
async fn test_timeout_is_treated_as_denial() {
    let session = SessionStore::in_memory();
    let provider = CountingProvider::hanging();
    let options = PositionOptions {
        timeout: Duration::from_millis(50),
        ..PositionOptions::default()
    };

    let snapshot = tracker(&session, &provider)
        .with_options(options)
        .start()
        .await;

    assert_eq!(snapshot.status, ConsentStatus::Denied);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_start_runs_once_per_load() {
    let session = SessionStore::in_memory();
    let provider = CountingProvider::at(10.0, 20.0);
    let tracker = tracker(&session, &provider);

    tracker.start().await;
    tracker.start().await;
    tracker.settled().await;

    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_no_capability_stays_idle() {
    let session = SessionStore::in_memory();
    let tracker = LocationTracker::new(session.clone(), None);

    let snapshot = tracker.start().await;

    assert_eq!(snapshot.status, ConsentStatus::Idle);
    assert_eq!(tracker.settled().await, None);
    assert_eq!(session.consent_decision().unwrap(), None);
}

#[tokio::test]
async fn test_subscribers_observe_grant() {
    let session = SessionStore::in_memory();
    let provider = CountingProvider::at(48.8566, 2.3522);
    let tracker = Arc::new(tracker(&session, &provider));
    let mut rx = tracker.subscribe();

    let settled = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.settled().await })
    };

    let granted = rx
        .wait_for(|s| s.status == ConsentStatus::Granted)
        .await
        .unwrap()
        .location;
    assert_eq!(granted, Some(Coordinate::new(48.8566, 2.3522)));

    let snapshot = settled.await.unwrap().unwrap();
    assert_eq!(snapshot.status, ConsentStatus::Granted);
}

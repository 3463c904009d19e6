// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login/logout identity linkage and error mapping.

use serde_json::Value;
use storefront_client::config::Config;
use storefront_client::error::ApiError;
use storefront_client::services::SessionEvent;
use storefront_client::store::{keys, SessionStore};
use storefront_client::Storefront;

mod common;
use common::{spawn_backend, test_client, FRESH_TOKEN};

#[tokio::test]
async fn test_login_archives_and_logout_restores_visitor() {
    let (url, _backend) = spawn_backend(true).await;
    let (storefront, session) = test_client(&url, None);
    session.raw().set(keys::VISITOR_ID, "v-anon").unwrap();
    let mut events = storefront.api.subscribe();

    let user = storefront.auth.login("ada", "engine1843").await.unwrap();

    assert_eq!(user.username, "ada");
    assert_eq!(session.access_token().unwrap().as_deref(), Some(FRESH_TOKEN));
    assert_eq!(session.profile().unwrap().unwrap().id, "u-1");
    assert_eq!(session.visitor_id().unwrap().as_deref(), Some("v-account"));
    assert_eq!(
        session.archived_visitor_id().unwrap().as_deref(),
        Some("v-anon")
    );
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::SignedIn {
            username: "ada".to_string()
        }
    );

    storefront.auth.logout().unwrap();

    assert_eq!(session.credentials().unwrap(), None);
    assert_eq!(session.profile().unwrap(), None);
    assert_eq!(session.visitor_id().unwrap().as_deref(), Some("v-anon"));
    assert_eq!(session.archived_visitor_id().unwrap(), None);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
}

#[tokio::test]
async fn test_bad_password_is_validation_error() {
    let (url, _backend) = spawn_backend(true).await;
    let (storefront, session) = test_client(&url, None);

    let err = storefront.auth.login("ada", "wrong-pass1").await.unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.user_message(), "Invalid username/email or password.");
    assert_eq!(session.credentials().unwrap(), None);
}

#[tokio::test]
async fn test_backend_field_errors_are_exposed() {
    let (url, _backend) = spawn_backend(true).await;
    let (storefront, _session) = test_client(&url, None);

    let err = storefront
        .auth
        .request_signup_code("ada@example.com")
        .await
        .unwrap_err();

    let fields = err.field_errors().expect("validation error");
    assert_eq!(fields["email"], vec!["A user with this email already exists."]);
}

#[tokio::test]
async fn test_client_side_validation_skips_network() {
    let (storefront, _session) = test_client("http://127.0.0.1:1/api/", None);

    let err = storefront
        .auth
        .request_signup_code("not-an-email")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput { .. }), "{:?}", err);
    assert_eq!(
        err.field_errors().unwrap()["email"],
        vec!["Enter a valid email address."]
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let config = Config::for_base_url("http://127.0.0.1:1/api");
    let storefront = Storefront::new(&config, SessionStore::in_memory(), None).unwrap();

    let err = storefront.api.get::<Value>("categories/").await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)), "{:?}", err);
    assert_eq!(err.user_message(), ApiError::NETWORK_MESSAGE);
}

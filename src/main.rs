// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storefront client command line.
//!
//! Usage: `storefront-client [product-id]`
//!
//! Resolves location consent, optionally signs in (`STOREFRONT_USERNAME` /
//! `STOREFRONT_PASSWORD`), lists categories, and records a view of the given
//! product.

use anyhow::Context;
use storefront_client::{
    config::Config,
    models::PopularPeriod,
    services::{Gated, SessionEvent},
    Storefront,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(api = %config.api_base_url, "Starting storefront client");

    let storefront = Storefront::from_config(&config).context("Failed to open session")?;

    let mut events = storefront.api.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::ReauthenticationRequired { login_url } => {
                    tracing::warn!(login_url = %login_url, "Please sign in again")
                }
                SessionEvent::SignedIn { username } => tracing::info!(%username, "Signed in"),
                SessionEvent::SignedOut => tracing::info!("Signed out"),
            }
        }
    });

    let location = storefront.location.start().await;
    tracing::info!(status = ?location.status, location = ?location.location, "Location resolved");

    if let (Ok(username), Ok(password)) = (
        std::env::var("STOREFRONT_USERNAME"),
        std::env::var("STOREFRONT_PASSWORD"),
    ) {
        match storefront.auth.login(&username, &password).await {
            Ok(user) => tracing::info!(user_id = %user.id, "Login succeeded"),
            Err(e) => tracing::error!(error = %e, message = %e.user_message(), "Login failed"),
        }
    }

    let categories = storefront.catalog.categories().await?;
    tracing::info!(count = categories.len(), "Categories loaded");

    match storefront
        .tracking
        .popular_products(PopularPeriod::default(), 10)
        .await?
    {
        Gated::Available(products) => tracing::info!(count = products.len(), "Popular nearby"),
        Gated::ConsentRequired => tracing::info!("Popular nearby needs location consent"),
    }

    if let Some(product_id) = std::env::args().nth(1) {
        storefront
            .api
            .set_current_path(&format!("/products/{}", product_id));

        let product = storefront.catalog.product(&product_id).await?;
        tracing::info!(title = %product.title, price = %product.price, "Product loaded");

        let outcome = storefront.tracking.record_product_view(&product_id).await?;
        tracing::info!(?outcome, "Product view handled");
    }

    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storefront_client=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visitor-behavior tracking.
//!
//! Product views are gated on location consent:
//! 1. Wait until consent has settled
//! 2. Denied → nothing is sent
//! 3. Granted → send, attaching the coordinate when one is known
//!
//! Likes, favorites and reviews only carry the visitor id.

use crate::error::Result;
use crate::models::product::Results;
use crate::models::tracking::ProductViewAck;
use crate::models::{
    ConsentStatus, LikeStatus, LocationSnapshot, PopularPeriod, ProductSummary, ProductViewEvent,
    Review, ReviewDraft,
};
use crate::services::api::{ApiClient, ApiRequest};
use crate::services::geolocation::LocationTracker;
use crate::store::SessionStore;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

/// Backend caps section sizes at this many products.
const MAX_SECTION_LIMIT: u32 = 50;

/// Result of a product-view recording attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Sent { duplicate: bool, with_location: bool },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Visitor declined location access
    ConsentDenied,
    /// Runtime has no geolocation capability
    LocationUnsupported,
}

/// Content of a location-gated section.
#[derive(Debug, Clone, PartialEq)]
pub enum Gated<T> {
    Available(T),
    /// Show the consent prompt instead of content.
    ConsentRequired,
}

/// Build the product-view event allowed by the current consent state.
///
/// Only `Granted` produces an event; the coordinate is attached when known
/// and left out otherwise, never holding the event back.
pub fn view_event_for(
    snapshot: &LocationSnapshot,
    product_id: &str,
    visitor_id: &str,
) -> Option<ProductViewEvent> {
    if snapshot.status != ConsentStatus::Granted {
        return None;
    }

    Some(ProductViewEvent {
        product_id: product_id.to_string(),
        visitor_id: visitor_id.to_string(),
        latitude: snapshot.location.map(|c| c.latitude),
        longitude: snapshot.location.map(|c| c.longitude),
    })
}

/// Body wrapper that adds the visitor id to any payload.
#[derive(Serialize)]
struct WithVisitor<'a, T: Serialize> {
    #[serde(flatten)]
    inner: &'a T,
    visitor_id: &'a str,
}

#[derive(Serialize)]
struct LikeToggle<'a> {
    product_id: &'a str,
    visitor_id: &'a str,
}

/// Tracking calls for the current visitor.
#[derive(Clone)]
pub struct TrackingService {
    api: ApiClient,
    location: Arc<LocationTracker>,
}

impl TrackingService {
    pub fn new(api: ApiClient, location: Arc<LocationTracker>) -> Self {
        Self { api, location }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    // ─── Product views ───────────────────────────────────────────────────────

    /// Record that the visitor opened a product page.
    pub async fn record_product_view(&self, product_id: &str) -> Result<TrackOutcome> {
        let Some(snapshot) = self.location.settled().await else {
            tracing::debug!(product_id, "No geolocation capability, view not tracked");
            return Ok(TrackOutcome::Skipped(SkipReason::LocationUnsupported));
        };

        let visitor_id = self.session().visitor_id_or_create()?;

        let Some(event) = view_event_for(&snapshot, product_id, &visitor_id) else {
            tracing::debug!(product_id, "Location consent denied, view not tracked");
            return Ok(TrackOutcome::Skipped(SkipReason::ConsentDenied));
        };

        let ack: ProductViewAck = self.api.post("tracking/product-views/", &event).await?;

        tracing::debug!(
            product_id,
            duplicate = ack.duplicate,
            with_location = event.has_location(),
            "Product view recorded"
        );

        Ok(TrackOutcome::Sent {
            duplicate: ack.duplicate,
            with_location: event.has_location(),
        })
    }

    // ─── Location-gated sections ─────────────────────────────────────────────

    /// Products this visitor viewed recently.
    pub async fn recent_products(&self, limit: u32) -> Result<Gated<Vec<ProductSummary>>> {
        if self.consent_denied().await {
            return Ok(Gated::ConsentRequired);
        }

        let visitor_id = self.session().visitor_id_or_create()?;
        let request = ApiRequest::get("tracking/recent-products/")
            .query("visitor_id", visitor_id)
            .query("limit", limit.clamp(1, MAX_SECTION_LIMIT));

        let page: Results<ProductSummary> = self.api.send(&request).await?;
        Ok(Gated::Available(page.results))
    }

    /// Products popular near the visitor over `period`.
    pub async fn popular_products(
        &self,
        period: PopularPeriod,
        limit: u32,
    ) -> Result<Gated<Vec<ProductSummary>>> {
        if self.consent_denied().await {
            return Ok(Gated::ConsentRequired);
        }

        let visitor_id = self.session().visitor_id_or_create()?;
        let request = ApiRequest::get("tracking/popular-products/")
            .query("visitor_id", visitor_id)
            .query("period", period.as_query())
            .query("limit", limit.clamp(1, MAX_SECTION_LIMIT));

        let page: Results<ProductSummary> = self.api.send(&request).await?;
        Ok(Gated::Available(page.results))
    }

    async fn consent_denied(&self) -> bool {
        matches!(
            self.location.settled().await,
            Some(LocationSnapshot {
                status: ConsentStatus::Denied,
                ..
            })
        )
    }

    // ─── Ungated tracking ────────────────────────────────────────────────────

    /// Products other visitors viewed alongside `product_id`.
    pub async fn also_viewed(&self, product_id: &str) -> Result<Vec<ProductSummary>> {
        let visitor_id = self.session().visitor_id_or_create()?;
        let request = ApiRequest::get(format!("tracking/also-viewed/{}/", product_id))
            .query("visitor_id", visitor_id);

        let page: Results<ProductSummary> = self.api.send(&request).await?;
        Ok(page.results)
    }

    /// Like or unlike a product; returns the new state.
    pub async fn toggle_like(&self, product_id: &str) -> Result<LikeStatus> {
        let visitor_id = self.session().visitor_id_or_create()?;
        let body = LikeToggle {
            product_id,
            visitor_id: &visitor_id,
        };
        self.api.post("tracking/product-like/", &body).await
    }

    pub async fn like_status(&self, product_id: &str) -> Result<LikeStatus> {
        let visitor_id = self.session().visitor_id_or_create()?;
        let request = ApiRequest::get(format!("tracking/product-like/{}/", product_id))
            .query("visitor_id", visitor_id);
        self.api.send(&request).await
    }

    /// Liked products, most recently liked first.
    pub async fn favorite_products(&self) -> Result<Vec<ProductSummary>> {
        let visitor_id = self.session().visitor_id_or_create()?;
        let request =
            ApiRequest::get("tracking/favorite-products/").query("visitor_id", visitor_id);

        let page: Results<ProductSummary> = self.api.send(&request).await?;
        Ok(page.results)
    }

    // ─── Reviews ─────────────────────────────────────────────────────────────

    pub async fn product_reviews(&self, product_id: &str) -> Result<Vec<Review>> {
        let page: Results<Review> = self
            .api
            .get(&format!("products/{}/reviews/", product_id))
            .await?;
        Ok(page.results)
    }

    /// Validate and publish a review.
    pub async fn submit_review(&self, product_id: &str, draft: &ReviewDraft) -> Result<Review> {
        draft.validate()?;

        let draft = ReviewDraft {
            name: draft
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            review_text: draft.review_text.trim().to_string(),
        };

        let visitor_id = self.session().visitor_id_or_create()?;
        let body = WithVisitor {
            inner: &draft,
            visitor_id: &visitor_id,
        };

        self.api
            .post(&format!("products/{}/reviews/create/", product_id), &body)
            .await
    }
}

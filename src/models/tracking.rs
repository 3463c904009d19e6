// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Visitor-behavior tracking payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of a product-view tracking call.
///
/// Coordinates are omitted from the JSON entirely when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductViewEvent {
    pub product_id: String,
    pub visitor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl ProductViewEvent {
    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Response of the product-view endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductViewAck {
    #[serde(default)]
    pub success: bool,
    /// True when the backend folded this into a recent view of the same product
    #[serde(default)]
    pub duplicate: bool,
}

/// Like state for one product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub product_id: String,
    #[serde(default)]
    pub like_count: u64,
}

/// Window used to rank popular products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopularPeriod {
    Day,
    #[default]
    Week,
    Month,
}

impl PopularPeriod {
    pub fn as_query(&self) -> &'static str {
        match self {
            PopularPeriod::Day => "24h",
            PopularPeriod::Week => "7d",
            PopularPeriod::Month => "30d",
        }
    }
}

/// A published review.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    pub id: String,
    #[serde(default)]
    pub reviewer_name: Option<String>,
    pub review_text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Review form payload.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ReviewDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "Name must be at most 200 characters."))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub review_text: String,
}

fn validate_not_blank(text: &str) -> Result<(), validator::ValidationError> {
    if text.trim().is_empty() {
        return Err(validator::ValidationError::new("blank")
            .with_message("Review text cannot be empty.".into()));
    }
    Ok(())
}

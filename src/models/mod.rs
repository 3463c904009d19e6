// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models exchanged with the storefront API and kept in the session store.

pub mod contact;
pub mod location;
pub mod product;
pub mod tracking;
pub mod user;

pub use contact::{ContactRequest, ContactSubmission};
pub use location::{ConsentDecision, ConsentStatus, Coordinate, LocationSnapshot};
pub use product::{Category, Page, ProductDetail, ProductSummary, SubCategory};
pub use tracking::{LikeStatus, PopularPeriod, ProductViewEvent, Review, ReviewDraft};
pub use user::{AuthResponse, Credentials, UserProfile};

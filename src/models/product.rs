//! Catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product as shown on list pages and tracking sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Decimal price as sent by the backend (string to avoid float rounding)
    pub price: String,
    /// Only present for authenticated users
    #[serde(default)]
    pub discount_price: Option<String>,
    #[serde(default)]
    pub main_image_url: Option<String>,
}

/// Full product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: String,
    #[serde(default)]
    pub discount_price: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub subcategories: Vec<SubCategory>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_main: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<SubCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Paginated list response (`count`/`next`/`previous`/`results`).
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// `{ "results": [...] }` wrapper used by tracking endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Results<T> {
    pub results: Vec<T>,
}

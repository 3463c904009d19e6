// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog browsing and debounced product search.

use crate::error::{ApiError, Result};
use crate::models::{
    Category, ContactRequest, ContactSubmission, Page, ProductDetail, ProductSummary, SubCategory,
};
use crate::services::api::{ApiClient, ApiRequest};
use crate::services::debounce::{Debouncer, Superseded};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// Filters for the product list. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    /// Case-insensitive match on title and description
    pub search: Option<String>,
    /// Case-insensitive substring of the SKU
    pub sku: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub created_after: Option<NaiveDate>,
    pub created_before: Option<NaiveDate>,
    pub updated_after: Option<NaiveDate>,
    pub updated_before: Option<NaiveDate>,
    /// One or more subcategory ids
    pub subcategories: Vec<String>,
    /// Backend ordering key, e.g. `-created_at`, `price`, `-likes_count`
    pub ordering: Option<String>,
    /// 1-based page number
    pub page: Option<u32>,
}

impl ProductQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            request = request.query("search", search);
        }
        if let Some(sku) = self.sku.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            request = request.query("sku", sku);
        }
        if let Some(min) = self.min_price {
            request = request.query("min_price", min);
        }
        if let Some(max) = self.max_price {
            request = request.query("max_price", max);
        }

        let dates = [
            ("created_at_after", self.created_after),
            ("created_at_before", self.created_before),
            ("updated_at_after", self.updated_after),
            ("updated_at_before", self.updated_before),
        ];
        for (key, date) in dates.into_iter().filter_map(|(k, d)| Some((k, d?))) {
            request = request.query(key, date.format("%Y-%m-%d"));
        }

        if !self.subcategories.is_empty() {
            request = request.query("subcategories", self.subcategories.join(","));
        }
        if let Some(ordering) = &self.ordering {
            request = request.query("ordering", ordering);
        }
        if let Some(page) = self.page.filter(|p| *p > 1) {
            request = request.query("page", page);
        }
        request
    }
}

/// Contact-form response envelope.
#[derive(Deserialize)]
struct ContactEnvelope {
    data: ContactSubmission,
}

/// Outcome of a debounced search.
#[derive(Debug, Clone)]
pub enum SearchResult {
    Results(Page<ProductSummary>),
    /// A newer query replaced this one before it was sent.
    Superseded,
}

#[derive(Clone)]
pub struct CatalogService {
    api: ApiClient,
    search_debounce: Arc<Debouncer>,
}

impl CatalogService {
    pub fn new(api: ApiClient, search_debounce: Duration) -> Self {
        Self {
            api,
            search_debounce: Arc::new(Debouncer::new(search_debounce)),
        }
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let page: Page<Category> = self.api.get("categories/").await?;
        Ok(page.results)
    }

    /// Subcategories, optionally limited to one category.
    pub async fn subcategories(&self, category: Option<&str>) -> Result<Vec<SubCategory>> {
        let mut request = ApiRequest::get("subcategories/");
        if let Some(category) = category {
            request = request.query("category", category);
        }
        let page: Page<SubCategory> = self.api.send(&request).await?;
        Ok(page.results)
    }

    pub async fn products(&self, query: &ProductQuery) -> Result<Page<ProductSummary>> {
        let request = query.apply(ApiRequest::get("products/"));
        self.api.send(&request).await
    }

    pub async fn product(&self, id: &str) -> Result<ProductDetail> {
        if id.trim().is_empty() {
            return Err(ApiError::RequestSetup("Product id is required".to_string()));
        }
        self.api.get(&format!("products/{}/", id.trim())).await
    }

    /// Send the contact form. Checked locally before anything goes out.
    pub async fn submit_contact(&self, form: &ContactRequest) -> Result<ContactSubmission> {
        form.validate()?;

        let form = form.trimmed();
        let envelope: ContactEnvelope = self.api.post("contact-us/", &form).await?;

        tracing::info!(id = %envelope.data.id, "Contact form submitted");
        Ok(envelope.data)
    }

    /// Search as the user types: the query is sent only after the debounce
    /// delay passes with no newer call.
    pub async fn search_debounced(&self, query: ProductQuery) -> Result<SearchResult> {
        let catalog = self.clone();
        let outcome = self
            .search_debounce
            .run(async move { catalog.products(&query).await })
            .await;

        match outcome {
            Ok(page) => Ok(SearchResult::Results(page?)),
            Err(Superseded) => Ok(SearchResult::Superseded),
        }
    }

    /// Drop a pending debounced search.
    pub fn cancel_search(&self) {
        self.search_debounce.cancel();
    }
}

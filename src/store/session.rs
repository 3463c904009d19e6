// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed access to the persisted session state.
//!
//! Handles:
//! - Credential pair (access + refresh)
//! - User profile snapshot
//! - Anonymous visitor id and its pre-login archive
//! - Location consent decision and last known coordinate

use super::{keys, KeyValueStore, StoreError};
use crate::models::{ConsentDecision, Coordinate, Credentials, UserProfile};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Shared handle over a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Session backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::MemoryStore::new()))
    }

    pub fn raw(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    // ─── Credentials ─────────────────────────────────────────────────────────

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get_non_empty(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get_non_empty(keys::REFRESH_TOKEN)
    }

    /// Both tokens, if both are stored.
    pub fn credentials(&self) -> Result<Option<Credentials>, StoreError> {
        match (self.access_token()?, self.refresh_token()?) {
            (Some(access), Some(refresh)) => Ok(Some(Credentials { access, refresh })),
            _ => Ok(None),
        }
    }

    pub fn store_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.store.set(keys::ACCESS_TOKEN, &credentials.access)?;
        self.store.set(keys::REFRESH_TOKEN, &credentials.refresh)
    }

    pub fn store_access_token(&self, access: &str) -> Result<(), StoreError> {
        self.store.set(keys::ACCESS_TOKEN, access)
    }

    pub fn store_refresh_token(&self, refresh: &str) -> Result<(), StoreError> {
        self.store.set(keys::REFRESH_TOKEN, refresh)
    }

    /// Drop tokens and the profile snapshot.
    pub fn clear_credentials(&self) -> Result<(), StoreError> {
        self.store.remove(keys::ACCESS_TOKEN)?;
        self.store.remove(keys::REFRESH_TOKEN)?;
        self.store.remove(keys::USER_PROFILE)
    }

    // ─── Profile ─────────────────────────────────────────────────────────────

    pub fn profile(&self) -> Result<Option<UserProfile>, StoreError> {
        self.get_json(keys::USER_PROFILE)
    }

    pub fn store_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.set_json(keys::USER_PROFILE, profile)
    }

    // ─── Visitor identity ────────────────────────────────────────────────────

    pub fn visitor_id(&self) -> Result<Option<String>, StoreError> {
        self.get_non_empty(keys::VISITOR_ID)
    }

    /// The current visitor id, generating and persisting a UUID v4 on first use.
    pub fn visitor_id_or_create(&self) -> Result<String, StoreError> {
        if let Some(id) = self.visitor_id()? {
            return Ok(id);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.store.set(keys::VISITOR_ID, &id)?;
        tracing::debug!(visitor_id = %id, "Generated anonymous visitor id");
        Ok(id)
    }

    pub fn archived_visitor_id(&self) -> Result<Option<String>, StoreError> {
        self.get_non_empty(keys::OLD_VISITOR_ID)
    }

    /// Switch to the account's visitor id after login or signup.
    ///
    /// The active anonymous id moves to the archive slot first, unless an
    /// earlier login already archived one (that one is the pre-login id).
    pub fn link_account_visitor(&self, account_visitor_id: Option<&str>) -> Result<(), StoreError> {
        let current = self.visitor_id()?;

        if let Some(current) = current.as_deref() {
            let already_archived = self.archived_visitor_id()?.is_some();
            let unchanged = account_visitor_id == Some(current);
            if !already_archived && !unchanged {
                self.store.set(keys::OLD_VISITOR_ID, current)?;
            }
        }

        if let Some(id) = account_visitor_id.filter(|id| !id.is_empty()) {
            self.store.set(keys::VISITOR_ID, id)?;
        }
        Ok(())
    }

    /// Pop the archived id and make it active again. No-op when nothing is archived.
    pub fn restore_archived_visitor_id(&self) -> Result<Option<String>, StoreError> {
        let Some(old) = self.archived_visitor_id()? else {
            return Ok(None);
        };

        self.store.set(keys::VISITOR_ID, &old)?;
        self.store.remove(keys::OLD_VISITOR_ID)?;
        tracing::debug!(visitor_id = %old, "Restored pre-login visitor id");
        Ok(Some(old))
    }

    // ─── Location ────────────────────────────────────────────────────────────

    /// Persisted consent decision. Unknown values read as "no decision".
    pub fn consent_decision(&self) -> Result<Option<ConsentDecision>, StoreError> {
        Ok(self
            .get_non_empty(keys::LOCATION_CONSENT)?
            .and_then(|v| ConsentDecision::parse(&v)))
    }

    pub fn store_consent_decision(&self, decision: ConsentDecision) -> Result<(), StoreError> {
        self.store.set(keys::LOCATION_CONSENT, decision.as_str())
    }

    pub fn last_location(&self) -> Result<Option<Coordinate>, StoreError> {
        self.get_json(keys::LAST_LOCATION)
    }

    /// Store a coordinate, rounded to the persisted precision.
    pub fn store_last_location(&self, coordinate: Coordinate) -> Result<(), StoreError> {
        self.set_json(keys::LAST_LOCATION, &coordinate.rounded())
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn get_non_empty(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(key)?.filter(|v| !v.trim().is_empty()))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.get_non_empty(key)? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.set(key, &json)
    }
}

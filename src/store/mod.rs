// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistent key-value storage (the browser's origin-scoped storage).

pub mod file;
pub mod memory;
pub mod session;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use session::SessionStore;

/// Storage keys as constants.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Last-known profile snapshot (JSON)
    pub const USER_PROFILE: &str = "user";
    pub const VISITOR_ID: &str = "visitor_id";
    /// Pre-login visitor id, restored on logout
    pub const OLD_VISITOR_ID: &str = "old_visitor_id";
    /// "granted" | "denied"
    pub const LOCATION_CONSENT: &str = "location_consent";
    /// Rounded `{latitude, longitude}` (JSON)
    pub const LAST_LOCATION: &str = "last_location";
}

/// Minimal `{get, set, remove}` capability over string values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Ok even if the key does not exist.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt value for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

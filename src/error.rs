// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types surfaced to calling code.
//!
//! Every variant is distinguishable so UI code can pick the right message:
//! a connectivity banner, inline form errors, or a redirect to login.

use crate::store::StoreError;
use serde_json::Value;
use std::collections::BTreeMap;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Field name → validation messages, as reported by the backend.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error returned by every API call.
///
/// `Clone` because a single refresh failure is delivered to every request
/// that was queued behind it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No response was received (DNS, connect, timeout, broken body).
    #[error("Network unreachable: {0}")]
    Network(String),

    /// Backend rejected the input with field-level messages.
    #[error("Validation failed: {message}")]
    Validation {
        status: u16,
        message: String,
        fields: FieldErrors,
    },

    /// Any other non-success response.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Client-side form checks failed; nothing was sent.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String, fields: FieldErrors },

    /// The request could not be built (bad URL, unencodable body).
    #[error("Invalid request: {0}")]
    RequestSetup(String),

    /// Refresh credential missing or refresh rejected; the user must log in again.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Still unauthorized after the single permitted retry.
    #[error("Not authorized")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Generic connectivity message shown in the dismissible banner.
    pub const NETWORK_MESSAGE: &'static str =
        "Unable to reach the server. Please check your connection and try again.";

    /// True for failures that end in a redirect to the login page.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::SessionExpired | ApiError::Unauthorized)
    }

    /// Per-field messages; `None` unless this is a validation failure
    /// (from the backend or from client-side checks).
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation { fields, .. } | ApiError::InvalidInput { fields, .. } => {
                Some(fields)
            }
            _ => None,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Validation { status, .. } | ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => Self::NETWORK_MESSAGE.to_string(),
            ApiError::Validation { message, .. }
            | ApiError::InvalidInput { message, .. }
            | ApiError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Classify a non-success response body.
    ///
    /// 400/422 with an object body that maps fields to messages becomes
    /// `Validation`; everything else is `Server`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();

        if let Some(Value::Object(map)) = &parsed {
            let message = first_error_message(map).unwrap_or_else(|| format!("HTTP {}", status));
            let fields = collect_field_errors(map);

            if matches!(status, 400 | 422) && !fields.is_empty() {
                return ApiError::Validation {
                    status,
                    message,
                    fields,
                };
            }
            return ApiError::Server { status, message };
        }

        let message = match body.trim() {
            "" => format!("HTTP {}", status),
            text => text.chars().take(200).collect(),
        };
        ApiError::Server { status, message }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::RequestSetup(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        collect_validation_errors("", &errors, &mut fields);

        let message = fields
            .values()
            .flat_map(|msgs| msgs.iter())
            .next()
            .cloned()
            .unwrap_or_else(|| "Invalid input".to_string());

        ApiError::InvalidInput { message, fields }
    }
}

/// Flatten nested struct and list errors into dotted keys such as
/// `security_questions[0].answer`.
fn collect_validation_errors(prefix: &str, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.entry(path)
                    .or_default()
                    .extend(errs.iter().map(validation_message));
            }
            ValidationErrorsKind::Struct(inner) => collect_validation_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

fn validation_message(error: &ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("Invalid value ({})", error.code))
}

/// Keys that carry a single top-level message rather than a field error.
const MESSAGE_KEYS: [&str; 3] = ["detail", "error", "message"];

/// Pick the first human-readable message out of an error body.
fn first_error_message(map: &serde_json::Map<String, Value>) -> Option<String> {
    for key in MESSAGE_KEYS {
        if let Some(Value::String(s)) = map.get(key) {
            return Some(s.clone());
        }
    }

    map.values().find_map(first_string)
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_string),
        Value::Object(map) => map.values().find_map(first_string),
        _ => None,
    }
}

fn collect_field_errors(map: &serde_json::Map<String, Value>) -> FieldErrors {
    map.iter()
        .filter(|(key, _)| !MESSAGE_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let messages: Vec<String> = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items.iter().filter_map(first_string).collect(),
                _ => Vec::new(),
            };
            (!messages.is_empty()).then(|| (key.clone(), messages))
        })
        .collect()
}

/// Result type alias for client calls
pub type Result<T> = std::result::Result<T, ApiError>;

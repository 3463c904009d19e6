// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact-us form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Contact form as typed by the visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct ContactRequest {
    #[validate(
        length(max = 200, message = "Name must be at most 200 characters."),
        custom(function = "name_present")
    )]
    pub name: String,
    #[validate(
        length(max = 20, message = "Phone must be at most 20 characters."),
        custom(function = "phone_present")
    )]
    pub phone: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(custom(function = "message_present"))]
    pub message: String,
}

impl ContactRequest {
    /// Copy with surrounding whitespace stripped, as the backend stores it.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

fn present(text: &str, message: &'static str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(message.into()));
    }
    Ok(())
}

fn name_present(name: &str) -> Result<(), ValidationError> {
    present(name, "Name cannot be empty.")
}

fn phone_present(phone: &str) -> Result<(), ValidationError> {
    present(phone, "Phone cannot be empty.")
}

fn message_present(message: &str) -> Result<(), ValidationError> {
    present(message, "Message cannot be empty.")
}

/// Stored contact message echoed back by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactSubmission {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

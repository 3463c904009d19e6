//! Account models: credentials, profile snapshot, signup payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Access/refresh credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Short-lived bearer token
    pub access: String,
    /// Long-lived token exchanged for a new access token
    pub refresh: String,
}

/// Response of the token refresh endpoint. `refresh` is present only when
/// the backend rotates refresh tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Last-known profile fields, persisted as the user snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Server-assigned visitor id linked to this account
    #[serde(default)]
    pub visitor_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Login and signup response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub tokens: Credentials,
}

/// Login form payload.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username or email is required."))]
    pub username_or_email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// One of the three security questions chosen at signup.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecurityQuestion {
    #[validate(length(min = 1, max = 255, message = "Question text must be 1-255 characters."))]
    pub question_text: String,
    #[validate(length(min = 1, max = 100, message = "Answer must be 1-100 characters."))]
    pub answer: String,
    #[validate(range(min = 1, max = 3, message = "Question order must be 1, 2, or 3."))]
    pub question_order: u8,
}

/// Signup form payload.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "First name cannot be empty."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name cannot be empty."))]
    pub last_name: String,
    #[validate(length(min = 1, max = 150, message = "Username cannot be empty."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    /// Verified e-mail OTP code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Filled in by the client from the session store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<String>,
    #[validate(
        length(equal = 3, message = "Exactly three security questions are required."),
        nested
    )]
    pub security_questions: Vec<SecurityQuestion>,
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
}

/// A security question as shown during password recovery (no answer).
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityQuestionPrompt {
    pub question_text: String,
    pub question_order: u8,
}

/// Password reset by answering a security question.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct SecurityAnswerReset {
    #[validate(length(min = 1))]
    pub username_or_email: String,
    #[validate(range(min = 1, max = 3, message = "Question order must be 1, 2, or 3."))]
    pub question_order: u8,
    #[validate(length(min = 1, message = "Answer cannot be empty."))]
    pub answer: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
}

/// Generic `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

/// At least 8 characters with one letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let fail = |msg: &'static str| {
        Err(ValidationError::new("password_strength").with_message(Cow::Borrowed(msg)))
    };

    if password.trim().chars().count() < 8 {
        return fail("Password must be at least 8 characters long.");
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return fail("Password must contain at least one letter.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return fail("Password must contain at least one number.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<SecurityQuestion> {
        (1..=3)
            .map(|order| SecurityQuestion {
                question_text: format!("Question {}", order),
                answer: "answer".to_string(),
                question_order: order,
            })
            .collect()
    }

    fn signup() -> SignupRequest {
        SignupRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "engine1843".to_string(),
            code: None,
            visitor_id: None,
            security_questions: questions(),
        }
    }

    #[test]
    fn password_strength_rules() {
        assert!(validate_password_strength("abc12345").is_ok());
        assert!(validate_password_strength("short1").is_err());
        assert!(validate_password_strength("12345678").is_err());
        assert!(validate_password_strength("abcdefgh").is_err());
    }

    #[test]
    fn signup_validation() {
        assert!(signup().validate().is_ok());

        let mut bad = signup();
        bad.security_questions.pop();
        assert!(bad.validate().is_err());

        let mut bad = signup();
        bad.email = "not-an-email".to_string();
        assert!(bad.validate().is_err());

        let mut bad = signup();
        bad.security_questions[0].question_order = 4;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn auth_response_parses() {
        let json = r#"{
            "user": {"id": "u1", "username": "ada", "email": "ada@example.com",
                     "first_name": "Ada", "last_name": "Lovelace",
                     "visitor_id": "v-server", "created_at": "2025-01-02T03:04:05Z"},
            "tokens": {"access": "a1", "refresh": "r1"}
        }"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.tokens.access, "a1");
        assert_eq!(resp.user.visitor_id.as_deref(), Some("v-server"));
        assert!(resp.user.created_at.is_some());
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account flows: login, signup, password recovery, profile, logout.
//!
//! A successful login or signup stores the credential pair and profile
//! snapshot, then links the anonymous visitor id to the account: the
//! pre-login id is archived so logout can bring it back.

use crate::error::Result;
use crate::models::user::{
    validate_password_strength, Acknowledgement, LoginRequest, ProfileUpdate, SecurityAnswerReset,
    SecurityQuestionPrompt, SignupRequest,
};
use crate::models::{AuthResponse, UserProfile};
use crate::services::api::{ApiClient, SessionEvent};
use crate::store::SessionStore;
use serde::{Deserialize, Serialize};
use validator::Validate;

const PROFILE_PATH: &str = "auth/profile/";

#[derive(Serialize, Validate)]
struct EmailRequest {
    #[validate(email(message = "Enter a valid email address."))]
    email: String,
}

#[derive(Serialize, Validate)]
struct CodeVerification {
    #[validate(email(message = "Enter a valid email address."))]
    email: String,
    #[validate(length(min = 1, message = "Code is required."))]
    code: String,
}

#[derive(Serialize, Validate)]
struct PasswordResetConfirm {
    #[validate(email(message = "Enter a valid email address."))]
    email: String,
    #[validate(length(min = 1, message = "Code is required."))]
    code: String,
    #[validate(custom(function = "validate_password_strength"))]
    new_password: String,
}

#[derive(Serialize)]
struct AccountLookup<'a> {
    username_or_email: &'a str,
}

/// Forgot-password step 1 returns either the bare list or a wrapper.
#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionsResponse {
    Wrapped {
        security_questions: Vec<SecurityQuestionPrompt>,
    },
    Bare(Vec<SecurityQuestionPrompt>),
}

impl From<QuestionsResponse> for Vec<SecurityQuestionPrompt> {
    fn from(response: QuestionsResponse) -> Self {
        let mut questions = match response {
            QuestionsResponse::Wrapped { security_questions } => security_questions,
            QuestionsResponse::Bare(questions) => questions,
        };
        questions.sort_by_key(|q| q.question_order);
        questions
    }
}

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Stored profile snapshot, without a network call.
    pub fn current_user(&self) -> Result<Option<UserProfile>> {
        Ok(self.session().profile()?)
    }

    pub fn is_signed_in(&self) -> Result<bool> {
        Ok(self.session().credentials()?.is_some())
    }

    // ─── Sign in / sign up ───────────────────────────────────────────────────

    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<UserProfile> {
        let request = LoginRequest {
            username_or_email: username_or_email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let response: AuthResponse = self.api.post("auth/login/", &request).await?;
        self.establish_session(response)
    }

    /// Create an account. The current anonymous visitor id is sent along so
    /// the backend can attach the visitor's history to the new account.
    pub async fn signup(&self, mut request: SignupRequest) -> Result<UserProfile> {
        if request.visitor_id.is_none() {
            request.visitor_id = Some(self.session().visitor_id_or_create()?);
        }
        request.security_questions.sort_by_key(|q| q.question_order);
        request.validate()?;

        let response: AuthResponse = self.api.post("auth/signup/", &request).await?;
        self.establish_session(response)
    }

    fn establish_session(&self, response: AuthResponse) -> Result<UserProfile> {
        let session = self.session();
        session.store_credentials(&response.tokens)?;
        session.store_profile(&response.user)?;
        session.link_account_visitor(response.user.visitor_id.as_deref())?;

        tracing::info!(username = %response.user.username, "Signed in");
        self.api.emit(SessionEvent::SignedIn {
            username: response.user.username.clone(),
        });

        Ok(response.user)
    }

    /// Forget the account and go back to browsing as the pre-login visitor.
    pub fn logout(&self) -> Result<()> {
        let session = self.session();
        session.restore_archived_visitor_id()?;
        session.clear_credentials()?;

        tracing::info!("Signed out");
        self.api.emit(SessionEvent::SignedOut);
        Ok(())
    }

    // ─── E-mail codes ────────────────────────────────────────────────────────

    pub async fn request_signup_code(&self, email: &str) -> Result<Acknowledgement> {
        let request = EmailRequest {
            email: email.trim().to_string(),
        };
        request.validate()?;
        self.api.post("auth/signup/request-code/", &request).await
    }

    pub async fn verify_signup_code(&self, email: &str, code: &str) -> Result<Acknowledgement> {
        let request = CodeVerification {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
        };
        request.validate()?;
        self.api.post("auth/signup/verify-code/", &request).await
    }

    pub async fn request_password_reset_code(&self, email: &str) -> Result<Acknowledgement> {
        let request = EmailRequest {
            email: email.trim().to_string(),
        };
        request.validate()?;
        self.api
            .post("auth/password-reset/request-code/", &request)
            .await
    }

    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<Acknowledgement> {
        let request = PasswordResetConfirm {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
            new_password: new_password.to_string(),
        };
        request.validate()?;
        self.api.post("auth/password-reset/confirm/", &request).await
    }

    // ─── Security-question recovery ──────────────────────────────────────────

    /// Forgot-password step 1: the account's questions, in order.
    pub async fn security_questions(
        &self,
        username_or_email: &str,
    ) -> Result<Vec<SecurityQuestionPrompt>> {
        let request = AccountLookup {
            username_or_email: username_or_email.trim(),
        };
        let response: QuestionsResponse = self
            .api
            .post("auth/forgot-password/step1/", &request)
            .await?;
        Ok(response.into())
    }

    /// Forgot-password step 2: answer one question and set a new password.
    pub async fn reset_password_with_answer(
        &self,
        request: &SecurityAnswerReset,
    ) -> Result<Acknowledgement> {
        request.validate()?;
        self.api.post("auth/forgot-password/step2/", request).await
    }

    // ─── Profile ─────────────────────────────────────────────────────────────

    pub async fn profile(&self) -> Result<UserProfile> {
        let profile: UserProfile = self.api.get(PROFILE_PATH).await?;
        self.session().store_profile(&profile)?;
        Ok(profile)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        update.validate()?;

        let profile: UserProfile = self.api.patch(PROFILE_PATH, update).await?;
        self.session().store_profile(&profile)?;
        tracing::debug!(username = %profile.username, "Profile updated");
        Ok(profile)
    }
}

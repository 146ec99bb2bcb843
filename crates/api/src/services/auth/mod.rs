//! Authentication service.
//!
//! Signup and login against the users collection. Passwords are stored and
//! compared as submitted.

mod error;

pub use error::AuthError;

use serde::Deserialize;

use storemari_core::Email;

use crate::db::{Database, RepositoryError};
use crate::models::{SignupDraft, User};

/// Login payload as received from the client.
#[derive(Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    database: &'a dyn Database,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(database: &'a dyn Database) -> Self {
        Self { database }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if a field is missing or invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn signup(&self, draft: SignupDraft) -> Result<User, AuthError> {
        let new_user = draft.into_new_user()?;

        if self
            .database
            .find_user_by_email(&new_user.email)
            .await?
            .is_some()
        {
            return Err(AuthError::UserAlreadyExists);
        }

        let user = self
            .database
            .insert_user(new_user)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Log in with email and password.
    ///
    /// The email is normalized the same way signup stores it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if either field is absent or empty.
    /// Returns `AuthError::InvalidCredentials` if no user matches.
    pub async fn login(&self, request: LoginRequest) -> Result<User, AuthError> {
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(AuthError::MissingCredentials);
        };
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let email = Email::parse(&email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .database
            .find_user_by_credentials(&email, &password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(user)
    }
}

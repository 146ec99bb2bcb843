//! Authentication error types.

use thiserror::Error;

use storemari_core::ValidationFailure;

use crate::db::RepositoryError;

/// Errors that can occur during signup and login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signup payload failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationFailure),

    /// Login payload lacked an email or password.
    #[error("Email and password are required")]
    MissingCredentials,

    /// No user matches the email and password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A user with this email is already registered.
    #[error("User already exists")]
    UserAlreadyExists,

    /// Repository/database error.
    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

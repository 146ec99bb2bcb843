//! User domain types.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use storemari_core::{Email, UserId, ValidationFailure};

/// Field order used when reporting signup validation errors.
const SIGNUP_FIELDS: &[&str] = &["name", "email", "password"];

/// A registered user (domain type).
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Store-generated user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized email address, unique per user.
    pub email: Email,
    /// Password as submitted at signup. Compared verbatim on login.
    pub password: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A validated user ready to be inserted.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Signup payload as received from the client.
///
/// Every field is optional at the serde level so that missing fields are
/// reported together by validation instead of failing deserialization.
#[derive(Default, Deserialize, Validate)]
pub struct SignupDraft {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, message = "Name is required")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Email is required"),
        custom(function = "validate_email")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,
}

impl SignupDraft {
    /// Trim, validate and normalize the draft into a [`NewUser`].
    ///
    /// # Errors
    ///
    /// Returns every failed rule, ordered name, email, password.
    pub fn into_new_user(self) -> Result<NewUser, ValidationFailure> {
        let draft = Self {
            name: self.name.map(|name| name.trim().to_string()),
            email: self.email.map(|email| email.trim().to_string()),
            password: self.password,
        };

        draft
            .validate()
            .map_err(|report| ValidationFailure::from_report(None, &report, SIGNUP_FIELDS))?;

        match (draft.name, draft.email, draft.password) {
            (Some(name), Some(email), Some(password)) => {
                let email = Email::parse(&email).map_err(|e| email_failure(&e))?;
                Ok(NewUser {
                    name,
                    email,
                    password,
                })
            }
            _ => Err(ValidationFailure::new(
                None,
                vec![storemari_core::FieldError::new(
                    "name",
                    "Name, email, and password are required",
                )],
            )),
        }
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    Email::parse(email).map(|_| ()).map_err(|e| {
        let mut error = ValidationError::new("email");
        error.message = Some(e.to_string().into());
        error
    })
}

fn email_failure(error: &storemari_core::EmailError) -> ValidationFailure {
    ValidationFailure::new(
        None,
        vec![storemari_core::FieldError::new("email", error.to_string())],
    )
}

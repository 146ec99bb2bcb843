//! Signup and login handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;

use storemari_core::UserId;

use crate::error::Result;
use crate::models::{SignupDraft, User};
use crate::services::auth::{AuthService, LoginRequest};
use crate::state::AppState;

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email.into_inner(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub user_id: UserId,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserSummary,
}

/// POST /api/auth/signup
///
/// # Errors
///
/// 400 on invalid fields or an existing email, 500 on store failure.
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let Json(draft) = payload?;
    let user = AuthService::new(state.database()).signup(draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            user_id: user.id.clone(),
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login
///
/// # Errors
///
/// 400 if a field is missing, 401 on mismatch, 500 on store failure.
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(request) = payload?;
    let user = AuthService::new(state.database()).login(request).await?;

    Ok(Json(LoginResponse {
        success: true,
        user: user.into(),
    }))
}

//! Connection check.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CollectionStats {
    pub users: u64,
    pub products: u64,
}

#[derive(Debug, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: &'static str,
    pub database: String,
    pub collections: Vec<String>,
    pub stats: CollectionStats,
}

/// GET /api/test-connection
///
/// Lists collections and counts documents, proving the store answers.
///
/// # Errors
///
/// Returns `AppError::ConnectionTest` if any store call fails.
pub async fn test_connection(State(state): State<AppState>) -> Result<Json<ConnectionReport>> {
    let database = state.database();

    let collections = database
        .collection_names()
        .await
        .map_err(AppError::ConnectionTest)?;
    let users = database
        .count_users()
        .await
        .map_err(AppError::ConnectionTest)?;
    let products = database
        .count_products()
        .await
        .map_err(AppError::ConnectionTest)?;

    Ok(Json(ConnectionReport {
        success: true,
        message: "Connection successful!",
        database: database.name().to_owned(),
        collections,
        stats: CollectionStats { users, products },
    }))
}

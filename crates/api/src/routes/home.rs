//! Service metadata.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// Routes exposed by this server, as advertised on `/`.
const ENDPOINTS: &[&str] = &[
    "GET /api/test-connection",
    "POST /api/auth/signup",
    "POST /api/auth/login",
    "GET /api/products",
    "GET /api/products/:id",
    "POST /api/products",
];

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub endpoints: &'static [&'static str],
}

/// GET /
pub async fn index(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "StoreMari API is running",
        version: env!("CARGO_PKG_VERSION"),
        database: state.database().backend(),
        endpoints: ENDPOINTS,
    })
}

//! Product catalog handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use storemari_core::ProductId;

use crate::error::Result;
use crate::models::{Product, ProductDraft};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProduct {
    pub success: bool,
    pub product_id: ProductId,
    pub product: Product,
}

/// GET /api/products
///
/// # Errors
///
/// 400 on a malformed query string, 500 on store failure.
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Product>>> {
    let Query(query) = query?;
    let products = CatalogService::new(state.database())
        .list(query.category.as_deref())
        .await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
///
/// # Errors
///
/// 404 if absent, 500 on store failure or an id the store cannot parse.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.database())
        .get(&ProductId::new(id))
        .await?;
    Ok(Json(product))
}

/// POST /api/products
///
/// # Errors
///
/// 400 on validation failure, 500 on store failure.
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ProductDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedProduct>)> {
    let Json(draft) = payload?;
    let product = CatalogService::new(state.database()).create(draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedProduct {
            success: true,
            product_id: product.id.clone(),
            product,
        }),
    ))
}

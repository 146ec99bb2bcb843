//! Product catalog service.

use thiserror::Error;

use storemari_core::{Category, ProductId, ValidationFailure};

use crate::db::{Database, RepositoryError};
use crate::models::{Product, ProductDraft};

/// Query value that disables category filtering.
const ALL_CATEGORIES: &str = "all";

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Product payload failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationFailure),

    /// No product with the requested id.
    #[error("Product not found")]
    NotFound,

    /// Repository/database error.
    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

/// How a `category` query parameter restricts a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CategoryFilter {
    Any,
    Only(Category),
    /// A value outside the category set; matches nothing.
    Unknown,
}

impl CategoryFilter {
    fn from_query(category: Option<&str>) -> Self {
        match category.map(str::trim) {
            None | Some("" | ALL_CATEGORIES) => Self::Any,
            Some(value) => value
                .parse::<Category>()
                .map_or(Self::Unknown, Self::Only),
        }
    }
}

/// Product catalog service.
pub struct CatalogService<'a> {
    database: &'a dyn Database,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(database: &'a dyn Database) -> Self {
        Self { database }
    }

    /// List products, optionally filtered by a raw `category` query value.
    ///
    /// Absent, empty or `all` returns every product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        let products = match CategoryFilter::from_query(category) {
            CategoryFilter::Any => self.database.list_products(None).await?,
            CategoryFilter::Only(category) => self.database.list_products(Some(category)).await?,
            CategoryFilter::Unknown => Vec::new(),
        };
        Ok(products)
    }

    /// Fetch a product by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id, or
    /// `CatalogError::Repository` if the store fails or rejects the id.
    pub async fn get(&self, id: &ProductId) -> Result<Product, CatalogError> {
        self.database
            .find_product(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Validate and insert a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` listing every failed rule, or
    /// `CatalogError::Repository` if the insert fails.
    pub async fn create(&self, draft: ProductDraft) -> Result<Product, CatalogError> {
        let new_product = draft.into_new_product()?;
        let product = self.database.insert_product(new_product).await?;

        tracing::info!(product_id = %product.id, category = %product.category, "Product created");
        Ok(product)
    }
}

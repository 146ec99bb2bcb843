//! Document store access.
//!
//! # Collections
//!
//! - `users` - Signup/login accounts (email is the uniqueness key)
//! - `products` - Catalog entries
//!
//! # Backends
//!
//! - [`mongo`] - MongoDB through the native driver (default)
//! - [`astra`] - Astra Data API, JSON commands over HTTPS
//!
//! Both implement [`Database`]; handlers only ever see `dyn Database`. There
//! is no migration tooling: collections are created on first insert and the
//! schema is enforced by the models.

pub mod astra;
#[cfg(test)]
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;

use storemari_core::{Category, Email, ProductId};

use crate::config::DatabaseConfig;
use crate::models::{NewProduct, NewUser, Product, User};

/// Name of the users collection.
pub const USERS_COLLECTION: &str = "users";
/// Name of the products collection.
pub const PRODUCTS_COLLECTION: &str = "products";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Error from the MongoDB driver.
    #[error("{0}")]
    Mongo(#[from] mongodb::error::Error),

    /// HTTP transport error talking to the Data API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Data API answered with an error payload.
    #[error("Data API error: {0}")]
    DataApi(String),

    /// An identifier could not be interpreted by the store.
    #[error("Cast to ObjectId failed for value \"{0}\"")]
    InvalidId(String),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// An index could not be built over the existing data.
    #[error("index creation failed: {0}")]
    Index(String),
}

/// Current time at the precision both stores keep (milliseconds).
///
/// Entities returned from an insert carry this value, so the created object
/// matches what a later read returns.
#[must_use]
pub fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// User collection operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by (normalized) email.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Find the user whose email and password both match exactly.
    async fn find_user_by_credentials(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Insert a new user, stamping `createdAt`/`updatedAt`.
    ///
    /// Returns `RepositoryError::Conflict` if the store rejects a duplicate email.
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Number of users.
    async fn count_users(&self) -> Result<u64, RepositoryError>;
}

/// Product collection operations.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// List products, optionally restricted to one category.
    async fn list_products(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Fetch a single product.
    ///
    /// Returns `RepositoryError::InvalidId` if the id is not in the store's
    /// identifier format.
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a new product, stamping `createdAt`/`updatedAt`.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Number of products.
    async fn count_products(&self) -> Result<u64, RepositoryError>;
}

/// A connected document store.
#[async_trait]
pub trait Database: UserRepository + ProductRepository {
    /// Backend name for diagnostics ("MongoDB", "Astra DB").
    fn backend(&self) -> &'static str;

    /// Active database (or keyspace) name.
    fn name(&self) -> &str;

    /// Names of the collections that currently exist.
    async fn collection_names(&self) -> Result<Vec<String>, RepositoryError>;

    /// Release the underlying connections.
    async fn close(&self);
}

/// Connect to the configured backend and report what is there.
///
/// Logs the active database name and its collections so a misconfigured
/// connection string is obvious at startup.
///
/// # Errors
///
/// Returns `RepositoryError` if the store is unreachable or rejects the
/// credentials. No retry is attempted.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn Database>, RepositoryError> {
    tracing::info!(backend = config.backend_name(), "Connecting to database");

    let database: Box<dyn Database> = match config {
        DatabaseConfig::MongoDb { uri, database } => {
            Box::new(mongo::MongoDatabase::connect(uri, database.as_deref()).await?)
        }
        DatabaseConfig::Astra {
            endpoint,
            token,
            keyspace,
        } => Box::new(astra::AstraDatabase::new(endpoint, token, keyspace)?),
    };

    let collections = database.collection_names().await?;
    tracing::info!(
        backend = database.backend(),
        database = database.name(),
        "Database connected"
    );
    if collections.is_empty() {
        tracing::info!("No collections yet (will be created when data is added)");
    } else {
        tracing::info!(collections = %collections.join(", "), "Existing collections");
    }

    Ok(database)
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn test_stored_now_keeps_milliseconds_only() {
        let now = stored_now();
        assert_eq!(now.nanosecond() % 1_000_000, 0);
        assert!(Utc::now() >= now);
    }
}

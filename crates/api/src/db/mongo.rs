//! MongoDB backend.
//!
//! Documents are stored with the field names the frontend expects
//! (`createdAt`, `updatedAt`) and BSON dates for timestamps. The driver pools
//! connections internally; one [`Client`] serves every request.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Document, doc};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use storemari_core::{Category, Email, ProductId, UserId};

use super::{
    Database, PRODUCTS_COLLECTION, ProductRepository, RepositoryError, USERS_COLLECTION,
    UserRepository, stored_now,
};
use crate::models::{NewProduct, NewUser, Product, User};

/// Database used when the connection string does not name one.
const DEFAULT_DATABASE: &str = "storemari";

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// User document as persisted in the `users` collection.
#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    email: String,
    password: String,
    #[serde(
        rename = "createdAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    created_at: DateTime<Utc>,
    #[serde(
        rename = "updatedAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    updated_at: DateTime<Utc>,
}

impl UserDocument {
    fn into_user(self) -> Result<User, RepositoryError> {
        let id = self
            .id
            .ok_or_else(|| RepositoryError::DataCorruption("user without _id".to_owned()))?;

        Ok(User {
            id: UserId::new(id.to_hex()),
            name: self.name,
            email: Email::from_stored(self.email),
            password: self.password,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Product document as persisted in the `products` collection.
#[derive(Debug, Serialize, Deserialize)]
struct ProductDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    category: Category,
    price: f64,
    image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    stock: i64,
    #[serde(
        rename = "createdAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    created_at: DateTime<Utc>,
    #[serde(
        rename = "updatedAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    updated_at: DateTime<Utc>,
}

impl ProductDocument {
    fn into_product(self) -> Result<Product, RepositoryError> {
        let id = self
            .id
            .ok_or_else(|| RepositoryError::DataCorruption("product without _id".to_owned()))?;

        Ok(Product {
            id: ProductId::new(id.to_hex()),
            name: self.name,
            category: self.category,
            price: self.price,
            image: self.image,
            description: self.description,
            stock: self.stock,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// MongoDB-backed [`Database`].
pub struct MongoDatabase {
    client: Client,
    database: mongodb::Database,
}

impl MongoDatabase {
    /// Connect, verify the server answers, and ensure indexes.
    ///
    /// The database is the one named in the URI, else `fallback_database`,
    /// else `storemari`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Mongo` if the URI is malformed, the server is
    /// unreachable, or index creation fails.
    pub async fn connect(
        uri: &SecretString,
        fallback_database: Option<&str>,
    ) -> Result<Self, RepositoryError> {
        let client = Client::with_uri_str(uri.expose_secret()).await?;
        let database = client.default_database().unwrap_or_else(|| {
            client.database(fallback_database.unwrap_or(DEFAULT_DATABASE))
        });

        // The driver connects lazily; ping so bad settings fail at startup.
        database.run_command(doc! { "ping": 1 }).await?;

        let this = Self { client, database };
        this.ensure_indexes().await?;
        Ok(this)
    }

    /// Unique email index: closes the window between the signup existence
    /// check and the insert.
    async fn ensure_indexes(&self) -> Result<(), RepositoryError> {
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users()
            .create_index(email_index)
            .await
            .map_err(email_index_error)?;

        let category_index = IndexModel::builder()
            .keys(doc! { "category": 1 })
            .build();
        self.products().create_index(category_index).await?;

        Ok(())
    }

    fn users(&self) -> Collection<UserDocument> {
        self.database.collection(USERS_COLLECTION)
    }

    fn products(&self) -> Collection<ProductDocument> {
        self.database.collection(PRODUCTS_COLLECTION)
    }
}

/// Filter selecting products of one category, or all of them.
fn category_filter(category: Option<Category>) -> Document {
    category.map_or_else(Document::new, |c| doc! { "category": c.as_str() })
}

/// Whether the server rejected a write or an index build over a unique key.
fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Explain a failed `users.email` index build.
fn email_index_error(error: mongodb::error::Error) -> RepositoryError {
    if is_duplicate_key(&error) {
        return RepositoryError::Index(format!(
            "unique index on {USERS_COLLECTION}.email cannot be built because existing \
             users share an email address; remove the duplicates and restart ({error})"
        ));
    }
    RepositoryError::Mongo(error)
}

#[async_trait]
impl UserRepository for MongoDatabase {
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.users()
            .find_one(doc! { "email": email.as_str() })
            .await?
            .map(UserDocument::into_user)
            .transpose()
    }

    async fn find_user_by_credentials(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.users()
            .find_one(doc! { "email": email.as_str(), "password": password })
            .await?
            .map(UserDocument::into_user)
            .transpose()
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let now = stored_now();
        let mut document = UserDocument {
            id: None,
            name: user.name,
            email: user.email.into_inner(),
            password: user.password,
            created_at: now,
            updated_at: now,
        };

        let result = self.users().insert_one(&document).await.map_err(|e| {
            if is_duplicate_key(&e) {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Mongo(e)
        })?;

        document.id = result.inserted_id.as_object_id();
        document.into_user()
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        Ok(self.users().count_documents(doc! {}).await?)
    }
}

#[async_trait]
impl ProductRepository for MongoDatabase {
    async fn list_products(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let documents: Vec<ProductDocument> = self
            .products()
            .find(category_filter(category))
            .await?
            .try_collect()
            .await?;

        documents
            .into_iter()
            .map(ProductDocument::into_product)
            .collect()
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let object_id = ObjectId::parse_str(id.as_str())
            .map_err(|_| RepositoryError::InvalidId(id.to_string()))?;

        self.products()
            .find_one(doc! { "_id": object_id })
            .await?
            .map(ProductDocument::into_product)
            .transpose()
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let now = stored_now();
        let mut document = ProductDocument {
            id: None,
            name: product.name,
            category: product.category,
            price: product.price,
            image: product.image,
            description: product.description,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };

        let result = self.products().insert_one(&document).await?;

        document.id = result.inserted_id.as_object_id();
        document.into_product()
    }

    async fn count_products(&self) -> Result<u64, RepositoryError> {
        Ok(self.products().count_documents(doc! {}).await?)
    }
}

#[async_trait]
impl Database for MongoDatabase {
    fn backend(&self) -> &'static str {
        "MongoDB"
    }

    fn name(&self) -> &str {
        self.database.name()
    }

    async fn collection_names(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.database.list_collection_names().await?)
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

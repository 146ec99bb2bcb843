//! Astra Data API backend.
//!
//! Every operation is a JSON command POSTed to
//! `{endpoint}/api/json/v1/{keyspace}[/{collection}]`, authenticated with a
//! `Token` header. Document ids are generated client-side (UUID v4) and
//! timestamps are stored as `{"$date": <epoch millis>}`.
//!
//! This backend is experimental: there is no unique index on user email, so
//! concurrent signups with the same address can both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

use storemari_core::{Category, Email, ProductId, UserId};

use super::{
    Database, PRODUCTS_COLLECTION, ProductRepository, RepositoryError, USERS_COLLECTION,
    UserRepository, stored_now,
};
use crate::models::{NewProduct, NewUser, Product, User};

/// Data API path prefix.
const API_PATH: &str = "api/json/v1";

/// Error code returned when writing to a collection that does not exist yet.
const COLLECTION_NOT_EXIST: &str = "COLLECTION_NOT_EXIST";

/// Data API date wrapper (`{"$date": millis}`).
mod api_date {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Wrapped {
        #[serde(rename = "$date")]
        millis: i64,
    }

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        Wrapped {
            millis: date.timestamp_millis(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let wrapped = Wrapped::deserialize(deserializer)?;
        Utc.timestamp_millis_opt(wrapped.millis)
            .single()
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password: String,
    #[serde(rename = "createdAt", with = "api_date")]
    created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "api_date")]
    updated_at: DateTime<Utc>,
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: UserId::new(doc.id),
            name: doc.name,
            email: Email::from_stored(doc.email),
            password: doc.password,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProductDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    category: Category,
    price: f64,
    image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    stock: i64,
    #[serde(rename = "createdAt", with = "api_date")]
    created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "api_date")]
    updated_at: DateTime<Utc>,
}

impl From<ProductDocument> for Product {
    fn from(doc: ProductDocument) -> Self {
        Self {
            id: ProductId::new(doc.id),
            name: doc.name,
            category: doc.category,
            price: doc.price,
            image: doc.image,
            description: doc.description,
            stock: doc.stock,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Envelope shared by every Data API response.
#[derive(Debug, Default, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "errorCode")]
    error_code: Option<String>,
}

impl CommandResponse {
    /// Fail on the first reported error.
    fn into_result(self) -> Result<Self, RepositoryError> {
        match self.errors.first() {
            None => Ok(self),
            Some(error) => Err(RepositoryError::DataApi(match &error.error_code {
                Some(code) => format!("{code}: {}", error.message),
                None => error.message.clone(),
            })),
        }
    }

    fn status_field(&self, field: &str) -> Option<&Value> {
        self.status.as_ref().and_then(|status| status.get(field))
    }

    fn data_field(&self, field: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(field))
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(value).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

/// Filter selecting products of one category, or all of them.
fn category_filter(category: Option<Category>) -> Value {
    category.map_or_else(|| json!({}), |c| json!({ "category": c.as_str() }))
}

/// Astra Data API-backed [`Database`].
pub struct AstraDatabase {
    client: reqwest::Client,
    base_url: String,
    keyspace: String,
}

impl AstraDatabase {
    /// Build a client for `endpoint`/`keyspace`.
    ///
    /// No request is made here; the first command doubles as the liveness
    /// check.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(
        endpoint: &Url,
        token: &SecretString,
        keyspace: &str,
    ) -> Result<Self, RepositoryError> {
        let mut headers = HeaderMap::new();
        let mut token_value = HeaderValue::from_str(token.expose_secret())
            .map_err(|e| RepositoryError::DataApi(format!("Invalid token format: {e}")))?;
        token_value.set_sensitive(true);
        headers.insert("Token", token_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: keyspace_url(endpoint, keyspace),
            keyspace: keyspace.to_owned(),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.base_url)
    }

    /// POST a single command and unwrap the response envelope.
    async fn command(&self, url: &str, body: &Value) -> Result<CommandResponse, RepositoryError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RepositoryError::DataApi(format!(
                "{} - {message}",
                status.as_u16()
            )));
        }

        response.json::<CommandResponse>().await?.into_result()
    }

    async fn find_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Value,
    ) -> Result<Option<T>, RepositoryError> {
        let response = self
            .command(
                &self.collection_url(collection),
                &json!({ "findOne": { "filter": filter } }),
            )
            .await?;

        match response.data_field("document") {
            None | Some(Value::Null) => Ok(None),
            Some(document) => decode(document.clone()).map(Some),
        }
    }

    /// Run `find`, following `nextPageState` until the result set is drained.
    async fn find_all<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Value,
    ) -> Result<Vec<T>, RepositoryError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_state: Option<String> = None;

        loop {
            let response = self.command(&url, &find_body(&filter, page_state.as_deref())).await?;

            if let Some(Value::Array(page)) = response.data_field("documents") {
                for document in page {
                    documents.push(decode(document.clone())?);
                }
            }

            page_state = response
                .data_field("nextPageState")
                .and_then(Value::as_str)
                .map(str::to_owned);
            if page_state.is_none() {
                return Ok(documents);
            }
        }
    }

    /// Insert a document, creating the collection on first use.
    async fn insert_one<T: Serialize + Sync>(
        &self,
        collection: &str,
        document: &T,
    ) -> Result<(), RepositoryError> {
        let body = json!({ "insertOne": { "document": document } });
        let url = self.collection_url(collection);

        match self.command(&url, &body).await {
            Err(RepositoryError::DataApi(message)) if message.starts_with(COLLECTION_NOT_EXIST) => {
                tracing::info!(collection = %collection, "Creating collection");
                self.command(
                    &self.base_url,
                    &json!({ "createCollection": { "name": collection } }),
                )
                .await?;
                self.command(&url, &body).await.map(|_| ())
            }
            result => result.map(|_| ()),
        }
    }

    async fn count(&self, collection: &str) -> Result<u64, RepositoryError> {
        let response = self
            .command(
                &self.collection_url(collection),
                &json!({ "countDocuments": { "filter": {} } }),
            )
            .await?;

        response
            .status_field("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| RepositoryError::DataCorruption("countDocuments without count".to_owned()))
    }
}

fn keyspace_url(endpoint: &Url, keyspace: &str) -> String {
    format!(
        "{}/{API_PATH}/{keyspace}",
        endpoint.as_str().trim_end_matches('/')
    )
}

fn find_body(filter: &Value, page_state: Option<&str>) -> Value {
    match page_state {
        Some(state) => json!({ "find": { "filter": filter, "options": { "pageState": state } } }),
        None => json!({ "find": { "filter": filter } }),
    }
}

#[async_trait]
impl UserRepository for AstraDatabase {
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let document: Option<UserDocument> = self
            .find_one(USERS_COLLECTION, json!({ "email": email.as_str() }))
            .await?;
        Ok(document.map(User::from))
    }

    async fn find_user_by_credentials(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let document: Option<UserDocument> = self
            .find_one(
                USERS_COLLECTION,
                json!({ "email": email.as_str(), "password": password }),
            )
            .await?;
        Ok(document.map(User::from))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let now = stored_now();
        let document = UserDocument {
            id: Uuid::new_v4().to_string(),
            name: user.name,
            email: user.email.into_inner(),
            password: user.password,
            created_at: now,
            updated_at: now,
        };

        self.insert_one(USERS_COLLECTION, &document).await?;
        Ok(document.into())
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        self.count(USERS_COLLECTION).await
    }
}

#[async_trait]
impl ProductRepository for AstraDatabase {
    async fn list_products(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let documents: Vec<ProductDocument> = self
            .find_all(PRODUCTS_COLLECTION, category_filter(category))
            .await?;
        Ok(documents.into_iter().map(Product::from).collect())
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        if Uuid::parse_str(id.as_str()).is_err() {
            return Err(RepositoryError::InvalidId(id.to_string()));
        }

        let document: Option<ProductDocument> = self
            .find_one(PRODUCTS_COLLECTION, json!({ "_id": id.as_str() }))
            .await?;
        Ok(document.map(Product::from))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let now = stored_now();
        let document = ProductDocument {
            id: Uuid::new_v4().to_string(),
            name: product.name,
            category: product.category,
            price: product.price,
            image: product.image,
            description: product.description,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };

        self.insert_one(PRODUCTS_COLLECTION, &document).await?;
        Ok(document.into())
    }

    async fn count_products(&self) -> Result<u64, RepositoryError> {
        self.count(PRODUCTS_COLLECTION).await
    }
}

#[async_trait]
impl Database for AstraDatabase {
    fn backend(&self) -> &'static str {
        "Astra DB"
    }

    fn name(&self) -> &str {
        &self.keyspace
    }

    async fn collection_names(&self) -> Result<Vec<String>, RepositoryError> {
        let response = self
            .command(&self.base_url, &json!({ "findCollections": {} }))
            .await?;

        match response.status_field("collections") {
            Some(collections) => decode(collections.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn close(&self) {
        // Connections are per-request; nothing to release.
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_url() {
        let endpoint = Url::parse("https://db-id-us-east1.apps.astra.datastax.com/").unwrap();
        assert_eq!(
            keyspace_url(&endpoint, "default_keyspace"),
            "https://db-id-us-east1.apps.astra.datastax.com/api/json/v1/default_keyspace"
        );
    }

    #[test]
    fn test_find_body_with_page_state() {
        let filter = category_filter(Some(Category::Kids));
        assert_eq!(
            find_body(&filter, None),
            json!({ "find": { "filter": { "category": "kids" } } })
        );
        assert_eq!(
            find_body(&filter, Some("abc")),
            json!({ "find": { "filter": { "category": "kids" }, "options": { "pageState": "abc" } } })
        );
    }

    #[test]
    fn test_errors_array_becomes_data_api_error() {
        let response: CommandResponse = serde_json::from_value(json!({
            "errors": [{ "message": "Collection does not exist", "errorCode": "COLLECTION_NOT_EXIST" }]
        }))
        .unwrap();

        match response.into_result() {
            Err(RepositoryError::DataApi(message)) => {
                assert!(message.starts_with(COLLECTION_NOT_EXIST));
                assert!(message.contains("Collection does not exist"));
            }
            other => panic!("expected DataApi error, got {other:?}"),
        }
    }

    #[test]
    fn test_product_document_dates_use_api_wrapper() {
        let document: ProductDocument = serde_json::from_value(json!({
            "_id": "0b8f1f7e-3c4a-4b8e-9c1d-2f3e4a5b6c7d",
            "name": "Tee",
            "category": "women",
            "price": 12.5,
            "image": "http://x/y.png",
            "createdAt": { "$date": 1_767_225_600_000_i64 },
            "updatedAt": { "$date": 1_767_225_600_000_i64 }
        }))
        .unwrap();

        let product = Product::from(document);
        assert_eq!(product.category, Category::Women);
        assert_eq!(product.stock, 0);
        assert_eq!(product.created_at.timestamp_millis(), 1_767_225_600_000);

        let round = serde_json::to_value(ProductDocument {
            id: product.id.to_string(),
            name: product.name,
            category: product.category,
            price: product.price,
            image: product.image,
            description: None,
            stock: 0,
            created_at: product.created_at,
            updated_at: product.updated_at,
        })
        .unwrap();
        assert_eq!(round["createdAt"], json!({ "$date": 1_767_225_600_000_i64 }));
    }

    #[test]
    fn test_inserted_product_matches_stored_copy() {
        let now = stored_now();
        let document = ProductDocument {
            id: "0b8f1f7e-3c4a-4b8e-9c1d-2f3e4a5b6c7d".to_string(),
            name: "Tee".to_string(),
            category: Category::Men,
            price: 19.99,
            image: "http://x/y.png".to_string(),
            description: None,
            stock: 3,
            created_at: now,
            updated_at: now,
        };
        let stored = serde_json::to_value(&document).unwrap();

        let inserted = Product::from(document);
        let fetched = Product::from(serde_json::from_value::<ProductDocument>(stored).unwrap());
        assert_eq!(inserted, fetched);
    }

    #[test]
    fn test_count_reads_status() {
        let response: CommandResponse =
            serde_json::from_value(json!({ "status": { "count": 7 } })).unwrap();
        assert_eq!(response.status_field("count").and_then(Value::as_u64), Some(7));
    }
}

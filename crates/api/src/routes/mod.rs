//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                     - Service metadata
//! GET  /api/test-connection  - Store liveness, collections and counts
//!
//! # Auth
//! POST /api/auth/signup      - Create a user
//! POST /api/auth/login       - Check email/password
//!
//! # Products
//! GET  /api/products         - List (optional ?category=men|women|kids|all)
//! POST /api/products         - Create
//! GET  /api/products/{id}    - Fetch one
//! ```

pub mod auth;
pub mod diagnostics;
pub mod home;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::index).post(products::create))
        .route("/api/products/{id}", get(products::show))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/api/test-connection", get(diagnostics::test_connection))
        .nest("/api/auth", auth_routes())
        .merge(product_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::db::memory::MemoryDatabase;
    use crate::db::{ProductRepository, UserRepository};
    use crate::state::AppState;

    struct TestApp {
        router: axum::Router,
        db: MemoryDatabase,
    }

    impl TestApp {
        fn new() -> Self {
            let db = MemoryDatabase::new();
            let state = AppState::new(Box::new(db.clone()));
            let router = crate::app(state, &["http://localhost:5173".to_string()]);
            Self { router, db }
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        async fn get(&self, uri: &str) -> (StatusCode, Value) {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
            self.send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }
    }

    fn tee() -> Value {
        json!({
            "name": "Tee",
            "category": "men",
            "price": 19.99,
            "image": "http://x/tee.png"
        })
    }

    #[tokio::test]
    async fn test_root_reports_service_info() {
        let app = TestApp::new();
        let (status, body) = app.get("/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "StoreMari API is running");
        assert_eq!(body["version"], "1.0.0");
        assert_eq!(body["database"], "MongoDB");
        assert!(body["endpoints"].as_array().unwrap().len() >= 6);
    }

    #[tokio::test]
    async fn test_connection_reports_collections_and_counts() {
        let app = TestApp::new();
        app.post("/api/products", &tee()).await;

        let (status, body) = app.get("/api/test-connection").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Connection successful!");
        assert_eq!(body["collections"], json!(["products"]));
        assert_eq!(body["stats"], json!({ "users": 0, "products": 1 }));
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let app = TestApp::new();
        app.db.set_failing(true);

        let (status, body) = app.get("/api/test-connection").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_create_then_get_product() {
        let app = TestApp::new();

        let (status, created) = app.post("/api/products", &tee()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["success"], true);
        let id = created["productId"].as_str().unwrap().to_string();
        assert_eq!(created["product"]["_id"], id.as_str());
        assert_eq!(created["product"]["stock"], 0);

        let (status, product) = app.get(&format!("/api/products/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(product["name"], "Tee");
        assert_eq!(product["category"], "men");
        assert_eq!(product["price"], 19.99);
        assert_eq!(product["image"], "http://x/tee.png");
        assert!(product["createdAt"].is_string());
        assert!(product["updatedAt"].is_string());
        assert_eq!(created["product"], product);
    }

    #[tokio::test]
    async fn test_created_timestamps_have_millisecond_precision() {
        let app = TestApp::new();
        let (_, created) = app.post("/api/products", &tee()).await;

        let created_at = created["product"]["createdAt"].as_str().unwrap();
        let parsed = chrono::DateTime::parse_from_rfc3339(created_at).unwrap();
        assert_eq!(chrono::Timelike::nanosecond(&parsed) % 1_000_000, 0);
    }

    #[tokio::test]
    async fn test_list_products_by_category() {
        let app = TestApp::new();
        app.post("/api/products", &tee()).await;
        app.post(
            "/api/products",
            &json!({ "name": "Dress", "category": "women", "price": 40, "image": "http://x/d.png" }),
        )
        .await;

        let (_, men) = app.get("/api/products?category=men").await;
        assert_eq!(men.as_array().unwrap().len(), 1);
        assert_eq!(men[0]["name"], "Tee");

        let (_, all) = app.get("/api/products?category=all").await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, unfiltered) = app.get("/api/products").await;
        assert_eq!(unfiltered.as_array().unwrap().len(), 2);

        let (status, unknown) = app.get("/api/products?category=shoes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(unknown, json!([]));
    }

    #[tokio::test]
    async fn test_malformed_query_string_is_json_error() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/products?category=men&category=kids").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("Failed to deserialize query string")
        );
    }

    #[tokio::test]
    async fn test_create_product_casts_numbers() {
        let app = TestApp::new();
        let mut payload = tee();
        payload["price"] = json!("19.99");
        payload["stock"] = json!(5.0);

        let (status, created) = app.post("/api/products", &payload).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["product"]["price"], 19.99);
        assert_eq!(created["product"]["stock"], 5);

        let mut bad = tee();
        bad["price"] = json!("cheap");
        bad["stock"] = json!(-1);
        let (status, body) = app.post("/api/products", &bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|detail| detail["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["price", "stock"]);
    }

    #[tokio::test]
    async fn test_product_not_found() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/products/0123456789abcdef01234567").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Product not found");
    }

    #[tokio::test]
    async fn test_malformed_product_id_is_server_error() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/products/not-an-id").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("not-an-id"));
    }

    #[tokio::test]
    async fn test_invalid_products_are_rejected() {
        let app = TestApp::new();

        let mut negative = tee();
        negative["price"] = json!(-1);
        negative["stock"] = json!(-2);
        let (status, body) = app.post("/api/products", &negative).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Product validation failed: price: Price cannot be negative, stock: Stock cannot be negative"
        );
        assert_eq!(body["details"].as_array().unwrap().len(), 2);

        let mut bad_category = tee();
        bad_category["category"] = json!("pets");
        let (status, body) = app.post("/api/products", &bad_category).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "category");

        assert_eq!(app.db.count_products().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_body() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/products")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_signup_and_login() {
        let app = TestApp::new();

        let (status, body) = app
            .post(
                "/api/auth/signup",
                &json!({ "name": "Ada", "email": "Ada@Example.com", "password": "secret1" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert!(body["userId"].is_string());
        assert_eq!(body["user"], json!({ "name": "Ada", "email": "ada@example.com" }));
        assert!(body["user"].get("password").is_none());

        let (status, body) = app
            .post(
                "/api/auth/login",
                &json!({ "email": "ada@example.com", "password": "secret1" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["name"], "Ada");
    }

    #[tokio::test]
    async fn test_duplicate_signup() {
        let app = TestApp::new();
        let user = json!({ "name": "Ada", "email": "ada@example.com", "password": "secret1" });
        app.post("/api/auth/signup", &user).await;

        let (status, body) = app
            .post(
                "/api/auth/signup",
                &json!({ "name": "Ada", "email": "ADA@example.com", "password": "secret1" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User already exists");
        assert_eq!(app.db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_signup_short_password() {
        let app = TestApp::new();
        let (status, body) = app
            .post(
                "/api/auth/signup",
                &json!({ "name": "Ada", "email": "ada@example.com", "password": "abc" }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Password must be at least 6 characters");
        assert_eq!(body["details"][0]["field"], "password");
    }

    #[tokio::test]
    async fn test_login_failures() {
        let app = TestApp::new();
        app.post(
            "/api/auth/signup",
            &json!({ "name": "Ada", "email": "ada@example.com", "password": "secret1" }),
        )
        .await;

        let (status, body) = app
            .post(
                "/api/auth/login",
                &json!({ "email": "ada@example.com", "password": "wrong12" }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, body) = app
            .post("/api/auth/login", &json!({ "email": "ada@example.com" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email and password are required");
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let app = TestApp::new();
        app.db.set_failing(true);

        let (status, body) = app.get("/api/products").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Data API error: store unavailable");
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let app = TestApp::new();
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .contains_key(crate::middleware::REQUEST_ID_HEADER)
        );
    }
}

//! End-to-end tests for the StoreMari API.
//!
//! The tests talk HTTP to an already running server and are ignored by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start MongoDB and the API
//! cargo run -p storemari-api
//!
//! # In another shell
//! API_BASE_URL=http://localhost:3001 cargo test -p storemari-integration-tests -- --ignored
//! ```

use reqwest::Client;
use uuid::Uuid;

/// Base URL of the server under test (`API_BASE_URL`, default `http://localhost:3001`).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Absolute URL for `path` on the server under test.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", api_base_url())
}

/// Plain HTTP client for the tests.
#[must_use]
pub fn client() -> Client {
    Client::new()
}

/// An email address no previous run has used.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", Uuid::new_v4().simple())
}

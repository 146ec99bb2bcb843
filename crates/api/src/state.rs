//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Database;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the single database handle created at
/// startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    database: Box<dyn Database>,
}

impl AppState {
    /// Create a new application state around a connected database.
    #[must_use]
    pub fn new(database: Box<dyn Database>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { database }),
        }
    }

    /// Get a reference to the database.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        self.inner.database.as_ref()
    }
}

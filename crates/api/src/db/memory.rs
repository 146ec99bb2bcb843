//! In-process store for router and service tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use storemari_core::{Category, Email, ProductId, UserId};

use super::{Database, ProductRepository, RepositoryError, UserRepository, stored_now};
use crate::models::{NewProduct, NewUser, Product, User};

/// `Vec`-backed [`Database`] with ObjectId-shaped ids.
///
/// Clones share the same collections, so a test can keep a handle on the
/// store it hands to the router.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Collections>,
}

#[derive(Default)]
struct Collections {
    users: Mutex<Vec<User>>,
    products: Mutex<Vec<Product>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    stale_email_reads: AtomicBool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as an unreachable store would.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Make email lookups miss, as a read racing another signup's insert
    /// would. Inserts still enforce the unique email.
    pub fn set_stale_email_reads(&self, stale: bool) {
        self.inner.stale_email_reads.store(stale, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataApi("store unavailable".to_owned()));
        }
        Ok(())
    }

    fn generate_id(&self) -> String {
        format!("{:024x}", self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        if self.inner.stale_email_reads.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(lock(&self.inner.users).iter().find(|u| &u.email == email).cloned())
    }

    async fn find_user_by_credentials(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        Ok(lock(&self.inner.users)
            .iter()
            .find(|u| &u.email == email && u.password == password)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.check()?;
        let mut users = lock(&self.inner.users);
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = stored_now();
        let user = User {
            id: UserId::new(self.generate_id()),
            name: user.name,
            email: user.email,
            password: user.password,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        self.check()?;
        Ok(lock(&self.inner.users).len() as u64)
    }
}

#[async_trait]
impl ProductRepository for MemoryDatabase {
    async fn list_products(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.check()?;
        Ok(lock(&self.inner.products)
            .iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect())
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.check()?;
        let raw = id.as_str();
        if raw.len() != 24 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RepositoryError::InvalidId(raw.to_owned()));
        }
        Ok(lock(&self.inner.products).iter().find(|p| &p.id == id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        self.check()?;
        let now = stored_now();
        let product = Product {
            id: ProductId::new(self.generate_id()),
            name: product.name,
            category: product.category,
            price: product.price,
            image: product.image,
            description: product.description,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };
        lock(&self.inner.products).push(product.clone());
        Ok(product)
    }

    async fn count_products(&self) -> Result<u64, RepositoryError> {
        self.check()?;
        Ok(lock(&self.inner.products).len() as u64)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    fn backend(&self) -> &'static str {
        "MongoDB"
    }

    fn name(&self) -> &str {
        "storemari_test"
    }

    async fn collection_names(&self) -> Result<Vec<String>, RepositoryError> {
        self.check()?;
        let mut names = Vec::new();
        if !lock(&self.inner.users).is_empty() {
            names.push(super::USERS_COLLECTION.to_owned());
        }
        if !lock(&self.inner.products).is_empty() {
            names.push(super::PRODUCTS_COLLECTION.to_owned());
        }
        Ok(names)
    }

    async fn close(&self) {}
}

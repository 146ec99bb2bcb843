//! Domain models for the API.
//!
//! These types are validated domain objects, separate from the document
//! shapes each database backend persists.

pub mod product;
pub mod user;

pub use product::{NewProduct, Product, ProductDraft};
pub use user::{NewUser, SignupDraft, User};

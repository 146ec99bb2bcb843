//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Signup and login
//! - `catalog` - Product listing, lookup and creation

pub mod auth;
pub mod catalog;

//! StoreMari Core - Shared domain types.
//!
//! This crate provides the types used across the StoreMari components:
//! - `api` - The HTTP backend (signup, login, product catalog)
//! - `integration-tests` - End-to-end tests against a running server
//!
//! # Architecture
//!
//! The core crate contains only types and validation helpers - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails and product categories
//! - [`validation`] - Field-scoped validation errors collected from `validator`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{FieldError, ValidationFailure};

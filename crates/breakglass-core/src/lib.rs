//! # breakglass-core
//!
//! Core crate for Breakglass. Contains configuration schemas, typed
//! identifiers, the tenant scope, pagination types, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other Breakglass crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorClass, ErrorKind};
pub use result::AppResult;

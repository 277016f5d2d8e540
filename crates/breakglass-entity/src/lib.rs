//! # breakglass-entity
//!
//! Domain entity models for Breakglass. Every struct in this crate
//! represents a database table row or a domain value object. Row types
//! additionally derive `sqlx::FromRow`.

pub mod audit;
pub mod impersonation;
pub mod user;

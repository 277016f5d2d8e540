//! Core type definitions used across the Breakglass workspace.

pub mod id;
pub mod pagination;
pub mod tenant;

pub use id::*;
pub use pagination::{PageRequest, PageResponse};
pub use tenant::TenantScope;

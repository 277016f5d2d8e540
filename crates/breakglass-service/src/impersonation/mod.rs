//! Impersonation lifecycle: start, end, lookup, verification, expiry.

pub mod request;
pub mod response;
pub mod service;

pub use request::{EndRequest, ListRequest, StartRequest};
pub use response::{EndResponse, StartResponse, VerifyResponse};
pub use service::ImpersonationService;

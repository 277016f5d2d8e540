//! Issuance of sessions bound to the impersonated user.

pub mod issuer;
pub mod token;

pub use issuer::SessionIssuer;
pub use token::TokenSessionIssuer;

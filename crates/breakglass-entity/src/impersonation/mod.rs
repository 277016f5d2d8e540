//! Impersonation session entities.

pub mod end_reason;
pub mod filter;
pub mod issued;
pub mod model;

pub use end_reason::EndReason;
pub use filter::SessionFilter;
pub use issued::{IssuedSession, UserSession};
pub use model::ImpersonationSession;

//! # breakglass-database
//!
//! PostgreSQL connection management, migrations, the concrete repositories
//! for every Breakglass table, and the two [`ImpersonationRepository`]
//! implementations: [`PgImpersonationStore`] and
//! [`MemoryImpersonationRepository`].

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{ImpersonationRepository, MemoryImpersonationRepository, PgImpersonationStore};

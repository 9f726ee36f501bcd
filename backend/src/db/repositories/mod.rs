//! Store implementations.
//!
//! - `local`: in-memory store for unit testing and local development
//! - `postgres`: PostgreSQL store with the Diesel ORM
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

pub use local::{LocalRepository, LocalStore};
#[cfg(feature = "postgres-repo")]
pub use postgres::{PoolStats, PostgresConfig, PostgresRepository, PostgresStore};

//! Persistence for the catalog.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers (crate::http)                            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │ one Repository per request
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository<E> / DataStore<E>      (repository)         │
//! │  Specification<E> + evaluator      (specification)      │
//! │  ChangeSet<E>                      (unit_of_work)       │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!          ┌──────────┴────────┐
//!          │                   │
//!    LocalStore          PostgresStore
//!    (in-memory)         (Diesel, r2d2)
//! ```
//!
//! Use [`StoreFactory`] or [`StoreBuilder`] to pick a backend at runtime.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod specification;
pub mod unit_of_work;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{ProductStore, RepositoryType, StoreBuilder, StoreFactory};
pub use repo_config::RepositoryConfig;
pub use repositories::{LocalRepository, LocalStore};
#[cfg(feature = "postgres-repo")]
pub use repositories::{PostgresRepository, PostgresStore};
pub use repository::{
    DataStore, ErrorContext, Repository, RepositoryError, RepositoryResult,
};
pub use specification::{Criterion, OrderBy, Paging, SortDirection, Specification};
pub use unit_of_work::{Change, ChangeSet};

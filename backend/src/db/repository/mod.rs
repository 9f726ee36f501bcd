//! Repository trait definitions for database operations.
//!
//! - [`error`]: error types shared by every backend
//! - [`generic`]: the entity-generic [`Repository`] unit of work and the
//!   [`DataStore`] that opens one per request
//!
//! ```ignore
//! async fn rename(store: &dyn DataStore<Product>, id: i32) -> RepositoryResult<bool> {
//!     let mut repo = store.begin();
//!     let Some(mut product) = repo.get_by_id(id).await? else {
//!         return Ok(false);
//!     };
//!     product.name = "Renamed".to_string();
//!     repo.update(product);
//!     repo.commit().await
//! }
//! ```

pub mod error;
pub mod generic;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use generic::{DataStore, Repository};

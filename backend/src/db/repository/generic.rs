//! The generic repository contract and the store that hands out instances.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::db::specification::Specification;
use crate::models::{Entity, ScalarValue};

/// Request-scoped data access for one entity type.
///
/// An instance is a unit of work: reads go straight to the store, while
/// [`add`](Repository::add), [`update`](Repository::update) and
/// [`remove`](Repository::remove) only stage changes. Nothing is written
/// until [`commit`](Repository::commit) succeeds.
///
/// Instances are not shared between requests; obtain a fresh one per request
/// from [`DataStore::begin`] and drop it when the request ends.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Point lookup by primary key.
    async fn get_by_id(&self, id: i32) -> RepositoryResult<Option<E>>;

    /// Every row, unpaged. Callers own the scale problem.
    async fn get_all(&self) -> RepositoryResult<Vec<E>>;

    /// First row produced by `spec`, if any.
    async fn get_one_with_spec(&self, spec: &Specification<E>) -> RepositoryResult<Option<E>>;

    /// Every row produced by `spec`.
    async fn get_all_with_spec(&self, spec: &Specification<E>) -> RepositoryResult<Vec<E>>;

    /// Distinct values of the specification's selector column.
    ///
    /// # Errors
    /// `ValidationError` when `spec` has no selector.
    async fn select_with_spec(&self, spec: &Specification<E>)
        -> RepositoryResult<Vec<ScalarValue>>;

    /// Number of rows matching the filter of `spec`; ordering and paging are
    /// ignored.
    async fn count_with_spec(&self, spec: &Specification<E>) -> RepositoryResult<usize>;

    /// Stage an insertion. The store assigns the id on commit.
    fn add(&mut self, entity: E);

    /// Stage a full replace of the row with the same id.
    fn update(&mut self, entity: E);

    /// Stage deletion of the row with the same id.
    fn remove(&mut self, entity: E);

    /// Whether a committed row with `id` exists. Staged changes are invisible.
    async fn exists(&self, id: i32) -> RepositoryResult<bool>;

    /// Flush staged changes atomically.
    ///
    /// Returns `true` iff at least one row was affected. An empty unit of work
    /// commits to `false`. If any staged change cannot be applied the whole
    /// commit fails and nothing is written.
    async fn commit(&mut self) -> RepositoryResult<bool>;

    /// Entities inserted by the most recent commit, with their assigned ids,
    /// in staging order.
    fn inserted(&self) -> &[E];
}

/// Shared handle to a backing store.
///
/// The store itself is safe to share across requests; the repositories it
/// opens are not.
#[async_trait]
pub trait DataStore<E: Entity>: Send + Sync {
    /// Open a fresh unit of work.
    fn begin(&self) -> Box<dyn Repository<E>>;

    /// Whether the store can currently serve queries.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Short backend name for logs and the health endpoint.
    fn backend_name(&self) -> &'static str;
}

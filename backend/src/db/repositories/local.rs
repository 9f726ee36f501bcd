//! In-memory local repository implementation.
//!
//! Rows live in a `BTreeMap` keyed by id behind a shared lock, which keeps
//! `get_all` in ascending id order and makes test runs deterministic. Each
//! request gets its own [`LocalRepository`] holding a private change set;
//! only [`commit`](Repository::commit) takes the write lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::repository::{
    DataStore, ErrorContext, Repository, RepositoryError, RepositoryResult,
};
use crate::db::specification::{self, Specification};
use crate::db::unit_of_work::{Change, ChangeSet};
use crate::models::{Entity, ScalarValue};

struct LocalData<E> {
    rows: BTreeMap<i32, E>,
    next_id: i32,
    // Connection health
    is_healthy: bool,
}

impl<E> Default for LocalData<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            is_healthy: true,
        }
    }
}

impl<E: Entity> LocalData<E> {
    fn check_health(&self, operation: &str) -> RepositoryResult<()> {
        if !self.is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Database is not healthy",
                ErrorContext::new(operation).with_entity(E::NAME),
            ));
        }
        Ok(())
    }

    fn insert(&mut self, mut entity: E) -> E {
        let id = if entity.id() > 0 {
            entity.id()
        } else {
            self.next_id
        };
        self.next_id = self.next_id.max(id.saturating_add(1));
        entity.set_id(id);
        self.rows.insert(id, entity.clone());
        entity
    }
}

/// Shared in-memory store for one entity type.
///
/// Cloning is cheap and every clone sees the same rows.
///
/// ```
/// use skistore::db::repositories::LocalStore;
/// use skistore::models::Product;
///
/// let store = LocalStore::with_rows(vec![
///     Product::new("Race Skis", "Stiff", "race.png", "Skis", "Atomic", 650.0),
/// ]);
/// assert_eq!(store.len(), 1);
/// ```
pub struct LocalStore<E: Entity> {
    data: Arc<RwLock<LocalData<E>>>,
}

impl<E: Entity> Clone for LocalStore<E> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<E: Entity> Default for LocalStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> LocalStore<E> {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Create a store pre-populated with `rows`.
    ///
    /// Rows with a positive id keep it; the rest are numbered from the
    /// current counter, in order.
    pub fn with_rows(rows: impl IntoIterator<Item = E>) -> Self {
        let store = Self::new();
        store.seed(rows);
        store
    }

    /// Insert committed rows directly, bypassing any unit of work.
    pub fn seed(&self, rows: impl IntoIterator<Item = E>) -> Vec<E> {
        let mut data = self.data.write();
        rows.into_iter().map(|row| data.insert(row)).collect()
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Remove every row and reset the id counter. Health is kept.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    pub fn len(&self) -> usize {
        self.data.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open a typed unit of work. [`DataStore::begin`] boxes the same thing.
    pub fn repository(&self) -> LocalRepository<E> {
        LocalRepository {
            data: Arc::clone(&self.data),
            changes: ChangeSet::new(),
            inserted: Vec::new(),
        }
    }
}

#[async_trait]
impl<E: Entity> DataStore<E> for LocalStore<E> {
    fn begin(&self) -> Box<dyn Repository<E>> {
        Box::new(self.repository())
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// Request-scoped context over a [`LocalStore`].
pub struct LocalRepository<E: Entity> {
    data: Arc<RwLock<LocalData<E>>>,
    changes: ChangeSet<E>,
    inserted: Vec<E>,
}

impl<E: Entity> LocalRepository<E> {
    /// Number of changes waiting for commit.
    pub fn pending(&self) -> usize {
        self.changes.len()
    }

    /// Snapshot of committed rows in id order, after a health check.
    fn snapshot(&self, operation: &str) -> RepositoryResult<Vec<E>> {
        let data = self.data.read();
        data.check_health(operation)?;
        Ok(data.rows.values().cloned().collect())
    }
}

/// Apply `changes` to `working` in staging order.
///
/// Fails on the first update or removal whose row does not exist, or on an
/// add once the id counter is exhausted. The caller owns `working` and
/// discards it on error.
fn apply_changes<E: Entity>(
    working: &mut LocalData<E>,
    changes: Vec<Change<E>>,
) -> RepositoryResult<(usize, Vec<E>)> {
    let mut affected = 0;
    let mut inserted = Vec::new();

    for change in changes {
        log::trace!("Applying {} of {} {}", change.kind(), E::NAME, change.entity().id());
        match change {
            Change::Added(mut entity) => {
                if working.rows.contains_key(&working.next_id) {
                    return Err(RepositoryError::internal_with_context(
                        format!("No {} id left to assign", E::NAME),
                        ErrorContext::new("commit").with_entity(E::NAME),
                    ));
                }
                // Ids are always store-assigned for new rows.
                entity.set_id(0);
                inserted.push(working.insert(entity));
            }
            Change::Updated(entity) => {
                let id = entity.id();
                match working.rows.get_mut(&id) {
                    Some(row) => *row = entity,
                    None => return Err(vanished::<E>("update", id)),
                }
            }
            Change::Removed(entity) => {
                let id = entity.id();
                if working.rows.remove(&id).is_none() {
                    return Err(vanished::<E>("remove", id));
                }
            }
        }
        affected += 1;
    }

    Ok((affected, inserted))
}

fn vanished<E: Entity>(kind: &str, id: i32) -> RepositoryError {
    RepositoryError::transaction_with_context(
        format!("Cannot {} {} {}: row does not exist", kind, E::NAME, id),
        ErrorContext::new("commit")
            .with_entity(E::NAME)
            .with_entity_id(id),
    )
}

#[async_trait]
impl<E: Entity> Repository<E> for LocalRepository<E> {
    async fn get_by_id(&self, id: i32) -> RepositoryResult<Option<E>> {
        let data = self.data.read();
        data.check_health("get_by_id")?;
        Ok(data.rows.get(&id).cloned())
    }

    async fn get_all(&self) -> RepositoryResult<Vec<E>> {
        self.snapshot("get_all")
    }

    async fn get_one_with_spec(&self, spec: &Specification<E>) -> RepositoryResult<Option<E>> {
        let rows = self.snapshot("get_one_with_spec")?;
        Ok(specification::evaluate(rows, spec).into_iter().next())
    }

    async fn get_all_with_spec(&self, spec: &Specification<E>) -> RepositoryResult<Vec<E>> {
        let rows = self.snapshot("get_all_with_spec")?;
        let result = specification::evaluate(rows, spec);
        log::debug!("{} spec matched {} rows", E::NAME, result.len());
        Ok(result)
    }

    async fn select_with_spec(
        &self,
        spec: &Specification<E>,
    ) -> RepositoryResult<Vec<ScalarValue>> {
        let rows = self.snapshot("select_with_spec")?;
        specification::project(rows, spec).ok_or_else(|| {
            RepositoryError::validation_with_context(
                "Specification has no selector",
                ErrorContext::new("select_with_spec").with_entity(E::NAME),
            )
        })
    }

    async fn count_with_spec(&self, spec: &Specification<E>) -> RepositoryResult<usize> {
        let data = self.data.read();
        data.check_health("count_with_spec")?;
        Ok(specification::count(data.rows.values(), spec))
    }

    fn add(&mut self, entity: E) {
        self.changes.stage_add(entity);
    }

    fn update(&mut self, entity: E) {
        self.changes.stage_update(entity);
    }

    fn remove(&mut self, entity: E) {
        self.changes.stage_remove(entity);
    }

    async fn exists(&self, id: i32) -> RepositoryResult<bool> {
        let data = self.data.read();
        data.check_health("exists")?;
        Ok(data.rows.contains_key(&id))
    }

    async fn commit(&mut self) -> RepositoryResult<bool> {
        self.inserted.clear();
        if self.changes.is_empty() {
            return Ok(false);
        }

        let mut data = self.data.write();
        data.check_health("commit")?;
        let changes = self.changes.take();

        // Work on a copy so a failing change leaves the store untouched.
        let mut working = LocalData {
            rows: data.rows.clone(),
            next_id: data.next_id,
            is_healthy: data.is_healthy,
        };
        let (affected, inserted) = apply_changes(&mut working, changes)?;
        *data = working;

        log::debug!("Committed {} {} change(s)", affected, E::NAME);
        self.inserted = inserted;
        Ok(affected > 0)
    }

    fn inserted(&self) -> &[E] {
        &self.inserted
    }
}

//! Request-scoped staging area for entity mutations.
//!
//! Repositories never write on `add`/`update`/`remove`; they push a [`Change`]
//! here and materialize the whole set on commit.

use crate::models::Entity;

/// One staged mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<E> {
    Added(E),
    Updated(E),
    Removed(E),
}

impl<E: Entity> Change<E> {
    pub fn entity(&self) -> &E {
        match self {
            Change::Added(e) | Change::Updated(e) | Change::Removed(e) => e,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Change::Added(_) => "add",
            Change::Updated(_) => "update",
            Change::Removed(_) => "remove",
        }
    }
}

/// Ordered list of staged changes.
#[derive(Debug, Clone)]
pub struct ChangeSet<E> {
    changes: Vec<Change<E>>,
}

impl<E> Default for ChangeSet<E> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<E: Entity> ChangeSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_add(&mut self, entity: E) {
        self.changes.push(Change::Added(entity));
    }

    pub fn stage_update(&mut self, entity: E) {
        self.changes.push(Change::Updated(entity));
    }

    pub fn stage_remove(&mut self, entity: E) {
        self.changes.push(Change::Removed(entity));
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change<E>> {
        self.changes.iter()
    }

    /// Drain every staged change, leaving the set empty.
    pub fn take(&mut self) -> Vec<Change<E>> {
        std::mem::take(&mut self.changes)
    }
}

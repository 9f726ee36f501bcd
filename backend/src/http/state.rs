//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repositories::LocalStore;
use crate::db::ProductStore;
use crate::models::Product;

/// Shared application state passed to all handlers.
///
/// Holds the store, never a repository: every request opens its own unit of
/// work through the [`Catalog`](super::extract::Catalog) extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: ProductStore,
}

impl AppState {
    pub fn new(store: ProductStore) -> Self {
        Self { store }
    }

    /// State over a fresh, empty in-memory store.
    pub fn local() -> Self {
        Self::new(Arc::new(LocalStore::<Product>::new()))
    }
}

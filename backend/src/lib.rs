//! # Ski Store Backend
//!
//! Product catalog REST API built on a generic repository with declarative
//! specifications and a request-scoped unit of work.
//!
//! ## Architecture
//!
//! - [`models`]: the [`Entity`](models::Entity) abstraction and the catalog
//!   [`Product`](models::Product)
//! - [`db`]: specifications, the generic repository, unit of work, and the
//!   local / Postgres stores
//! - [`catalog`]: listing parameters, the named product specifications, and
//!   start-up seeding
//! - [`http`]: axum router, extractors and handlers (feature `http-server`)

// RepositoryError carries a full ErrorContext.
#![allow(clippy::result_large_err)]

pub mod catalog;
pub mod db;
pub mod models;

#[cfg(feature = "http-server")]
pub mod http;
